//! Koselig Test Utilities
//!
//! Shared test infrastructure for the Koselig workspace:
//! - Proptest generators for records and identifiers
//! - Fixtures for a seeded product catalogue
//! - Tracing initialisation for tests

pub use koselig_storage::MockStorage;

pub use koselig_core::{
    KoseligConfig, KoseligError, KoseligResult, MetaKind, MetaRecord, PostRecord, PostStatus,
    SiteId, UserRecord,
};

/// Install a fmt subscriber that writes through the test harness.
///
/// Filtering follows `RUST_LOG`. Safe to call from every test; only the
/// first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Koselig types.

    use super::*;
    use proptest::prelude::*;

    /// Any site id, sentinels included.
    pub fn arb_site_id() -> impl Strategy<Value = SiteId> {
        prop_oneof![
            Just(SiteId::UNSET),
            Just(SiteId::PRIMARY),
            (2u64..10_000).prop_map(SiteId),
        ]
    }

    /// A site id that is routed to its own namespace on a multisite install.
    pub fn arb_routed_site_id() -> impl Strategy<Value = SiteId> {
        (2u64..10_000).prop_map(SiteId)
    }

    pub fn arb_table_prefix() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,6}_"
    }

    /// Meta keys drawn from a small alphabet so duplicates are common.
    pub fn arb_meta_key() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("price".to_string()),
            Just("colour".to_string()),
            Just("_edit_lock".to_string()),
            "[a-z]{1,3}",
        ]
    }

    pub fn arb_meta_value() -> impl Strategy<Value = String> {
        "[ -~]{0,24}"
    }

    /// Records of one owner with ids assigned in storage order.
    pub fn arb_meta_records(owner_id: u64) -> impl Strategy<Value = Vec<MetaRecord>> {
        prop::collection::vec((arb_meta_key(), arb_meta_value()), 0..24).prop_map(move |pairs| {
            pairs
                .into_iter()
                .enumerate()
                .map(|(i, (k, v))| MetaRecord::new(i as u64 + 1, owner_id, k, v))
                .collect()
        })
    }

    pub fn arb_post_status() -> impl Strategy<Value = PostStatus> {
        prop_oneof![
            Just(PostStatus::Publish),
            Just(PostStatus::Future),
            Just(PostStatus::Draft),
            Just(PostStatus::Pending),
            Just(PostStatus::Private),
            Just(PostStatus::Trash),
        ]
    }

    pub fn arb_post(id: u64) -> impl Strategy<Value = PostRecord> {
        ("[a-z][a-z0-9-]{0,15}", arb_post_status())
            .prop_map(move |(slug, status)| PostRecord::new(id, slug, status))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built data for common scenarios.

    use super::*;
    use koselig_fields::InMemoryFieldRegistry;
    use std::sync::Arc;

    /// Product owner used across the fixtures.
    pub const PRODUCT_ID: u64 = 42;

    /// Author of the product.
    pub const AUTHOR_ID: u64 = 3;

    /// Exported field group describing the product fields.
    pub fn product_field_group() -> String {
        serde_json::json!({
            "key": "group_product",
            "title": "Product",
            "fields": [
                {"key": "field_123", "name": "price", "label": "Price", "type": "number"},
                {"key": "field_124", "name": "on_sale", "label": "On sale", "type": "true_false"},
                {"key": "field_125", "name": "colours", "label": "Colours", "type": "select",
                 "multiple": 1, "choices": {"red": "Red", "blue": "Blue"}},
                {"key": "field_130", "name": "variants", "label": "Variants", "type": "repeater",
                 "sub_fields": [
                    {"key": "field_131", "name": "variants_0_sku", "label": "SKU", "type": "text"}
                 ]}
            ]
        })
        .to_string()
    }

    /// Registry loaded with [`product_field_group`].
    pub fn product_registry() -> KoseligResult<Arc<InMemoryFieldRegistry>> {
        let registry = InMemoryFieldRegistry::new();
        registry.load_group_json(&product_field_group())?;
        Ok(Arc::new(registry))
    }

    /// Meta rows of the product: values plus their field references.
    pub fn product_meta() -> Vec<MetaRecord> {
        [
            ("_price", "field_123"),
            ("price", "19.99"),
            ("_on_sale", "field_124"),
            ("on_sale", "1"),
            ("_colours", "field_125"),
            ("colours", "a:2:{i:0;s:3:\"red\";i:1;s:4:\"blue\";}"),
            ("_variants", "field_130"),
            ("variants", "1"),
            ("_variants_0_sku", "field_131"),
            ("variants_0_sku", "SKU-1"),
            ("_legacy", "not-a-field"),
            ("legacy", "old"),
            ("_thumbnail_id", "88"),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (k, v))| MetaRecord::new(i as u64 + 1, PRODUCT_ID, k, v))
        .collect()
    }

    /// Storage holding the published product, a draft and the author, all
    /// under `prefix` (a per-site prefix such as `wp_7_` for posts).
    pub fn seeded_storage(prefix: &str, base: &str) -> KoseligResult<Arc<MockStorage>> {
        let storage = MockStorage::new();
        let posts = format!("{prefix}posts");
        let postmeta = format!("{prefix}postmeta");

        let mut product = PostRecord::new(PRODUCT_ID, "blue-widget", PostStatus::Publish);
        product.post_title = "Blue Widget".to_string();
        product.post_type = "product".to_string();
        product.post_author = AUTHOR_ID;
        storage.insert_post(&posts, &product)?;
        storage.insert_post(&posts, &PostRecord::new(43, "upcoming", PostStatus::Draft))?;

        for record in product_meta() {
            storage.insert_meta(&postmeta, MetaKind::Post, &record)?;
        }

        storage.insert_user(
            &format!("{base}users"),
            &UserRecord {
                id: AUTHOR_ID,
                user_login: "editor".to_string(),
                user_nicename: "editor".to_string(),
                user_email: "editor@example.com".to_string(),
                display_name: "Ed Itor".to_string(),
                user_registered: None,
            },
        )?;
        storage.insert_meta(
            &format!("{base}usermeta"),
            MetaKind::User,
            &MetaRecord::new(1, AUTHOR_ID, "nickname", "ed"),
        )?;

        Ok(Arc::new(storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixtures_load() {
        let registry = fixtures::product_registry().unwrap();
        assert_eq!(registry.len(), 5);

        let storage = fixtures::seeded_storage("wp_", "wp_").unwrap();
        assert_eq!(storage.row_count("wp_posts").unwrap(), 2);
        assert_eq!(storage.row_count("wp_postmeta").unwrap(), fixtures::product_meta().len());
        assert_eq!(storage.row_count("wp_users").unwrap(), 1);
    }

    proptest! {
        #[test]
        fn prop_meta_records_owned(records in generators::arb_meta_records(9)) {
            prop_assert!(records.iter().all(|r| r.owner_id == 9));
        }
    }
}
