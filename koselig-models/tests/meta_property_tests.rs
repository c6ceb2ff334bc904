//! Property tests for meta reads, tenant binding and the published scope.

use std::sync::Arc;

use koselig_core::{CachingPolicy, MetaKind, PostStatus, SiteId};
use koselig_models::PostModel;
use koselig_storage::{KeySelection, MetaCache, MetaMap, MockStorage, TenantRouter, PUBLISHED_SCOPE};
use koselig_test_utils::generators::{
    arb_meta_records, arb_post, arb_routed_site_id, arb_site_id, arb_table_prefix,
};
use proptest::prelude::*;

const OWNER: u64 = 42;

fn model_with_meta(records: &[koselig_core::MetaRecord]) -> (PostModel, Arc<MockStorage>) {
    let storage = Arc::new(MockStorage::new());
    for record in records {
        storage
            .insert_meta("wp_postmeta", MetaKind::Post, record)
            .unwrap();
    }
    let model = PostModel::new(
        &TenantRouter::new("wp_", false),
        SiteId::PRIMARY,
        CachingPolicy::Disabled,
        Arc::clone(&storage) as Arc<dyn koselig_storage::QueryLayer>,
    );
    (model, storage)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Two full reads agree and hit storage once.
    #[test]
    fn prop_full_read_is_memoised(records in arb_meta_records(OWNER)) {
        let (model, storage) = model_with_meta(&records);
        let cache = MetaCache::new();

        let first = model.get_meta(&cache, OWNER, &KeySelection::All).unwrap();
        let second = model.get_meta(&cache, OWNER, &KeySelection::All).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(storage.query_count(), 1);
    }

    /// Single reads take the first duplicate, the map takes the last value
    /// at the position of the first.
    #[test]
    fn prop_duplicate_keys_resolve_in_opposite_directions(records in arb_meta_records(OWNER)) {
        let (model, _) = model_with_meta(&records);
        let cache = MetaCache::new();

        let map = model.get_meta(&cache, OWNER, &KeySelection::All).unwrap().into_map();

        let mut last = MetaMap::new();
        for r in &records {
            last.insert(r.meta_key.clone(), r.meta_value.clone());
        }
        prop_assert_eq!(&map, &last);

        let mut first_seen: Vec<String> = Vec::new();
        for r in &records {
            if !first_seen.contains(&r.meta_key) {
                first_seen.push(r.meta_key.clone());
            }
        }
        prop_assert_eq!(map.keys().cloned().collect::<Vec<_>>(), first_seen);

        for key in last.keys() {
            let one = model
                .get_meta(&cache, OWNER, &KeySelection::one(key.clone()))
                .unwrap()
                .into_one();
            let first = records.iter().find(|r| &r.meta_key == key).map(|r| r.meta_value.clone());
            prop_assert_eq!(one, first);
        }
    }

    /// A key list returns exactly the listed keys that exist.
    #[test]
    fn prop_key_list_is_subset(records in arb_meta_records(OWNER), wanted in prop::collection::vec("[a-z]{1,3}", 0..6)) {
        let (model, _) = model_with_meta(&records);
        let cache = MetaCache::new();

        let map = model
            .get_meta(&cache, OWNER, &KeySelection::many(wanted.clone()))
            .unwrap()
            .into_map();

        for key in map.keys() {
            prop_assert!(wanted.contains(key));
        }
        for key in &wanted {
            let exists = records.iter().any(|r| &r.meta_key == key);
            prop_assert_eq!(map.contains_key(key), exists);
        }
    }

    /// Sentinel sites and single-site installs use the base table.
    #[test]
    fn prop_tenant_binding(prefix in arb_table_prefix(), site in arb_site_id(), multisite in any::<bool>()) {
        let router = TenantRouter::new(prefix.clone(), multisite);
        let model = PostModel::new(&router, site, CachingPolicy::Disabled, Arc::new(MockStorage::new()));

        let expected = if multisite && !site.is_primary() {
            format!("{prefix}{site}_posts")
        } else {
            format!("{prefix}posts")
        };
        prop_assert_eq!(model.table(), expected.as_str());
        prop_assert_eq!(model.users().table(), format!("{prefix}users"));
    }

    /// A model keeps its tables after other sites' models are built.
    #[test]
    fn prop_binding_is_stable(site in arb_routed_site_id(), other in arb_site_id()) {
        let router = TenantRouter::new("wp_", true);
        let model = PostModel::new(&router, site, CachingPolicy::Disabled, Arc::new(MockStorage::new()));
        let before = model.table().to_string();

        let _other = PostModel::new(&router, other, CachingPolicy::Disabled, Arc::new(MockStorage::new()));

        prop_assert_eq!(model.table(), before.as_str());
        prop_assert_eq!(model.tenant().site_id(), site);
        prop_assert_eq!(model.meta_owner(1).table(), format!("wp_{site}_postmeta"));
    }

    /// Only published posts are visible by default; lifting the scope
    /// reveals every status.
    #[test]
    fn prop_published_scope(post in arb_post(5)) {
        let storage = Arc::new(MockStorage::new());
        storage.insert_post("wp_posts", &post).unwrap();
        let model = PostModel::new(
            &TenantRouter::new("wp_", false),
            SiteId::PRIMARY,
            CachingPolicy::Disabled,
            storage,
        );

        let visible = model.find(5).unwrap();
        prop_assert_eq!(visible.is_some(), post.post_status == PostStatus::Publish);

        let lifted = model
            .first(model.query().without_global_scope(PUBLISHED_SCOPE).where_eq("ID", 5u64))
            .unwrap();
        prop_assert_eq!(lifted, Some(post));
    }
}
