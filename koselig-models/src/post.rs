//! Posts of one site.

use std::sync::Arc;
use std::time::Duration;

use koselig_core::{
    CachingPolicy, KoseligConfig, KoseligResult, PostId, PostRecord, SiteId, Table, UserRecord,
};
use koselig_fields::{FieldResolver, ResolvedFields};
use koselig_storage::{
    published_scope, select_as, KeySelection, MetaCache, MetaOwner, MetaStore, MetaValue,
    QueryBuilder, QueryLayer, TenantContext, TenantRouter,
};
use tracing::debug;

use crate::user::UserModel;

/// Meta key holding a post's featured image id.
pub const THUMBNAIL_META_KEY: &str = "_thumbnail_id";

/// Facade over one site's posts table.
///
/// The tenant context is resolved once in the constructor. Every query
/// built through [`PostModel::query`] carries the published scope unless
/// the caller lifts it with
/// `without_global_scope(koselig_storage::PUBLISHED_SCOPE)`.
#[derive(Clone)]
pub struct PostModel {
    tenant: TenantContext,
    table: String,
    layer: Arc<dyn QueryLayer>,
    meta: MetaStore,
    users: UserModel,
    remember_for: Option<Duration>,
}

impl std::fmt::Debug for PostModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostModel")
            .field("site_id", &self.tenant.site_id())
            .field("table", &self.table)
            .field("remember_for", &self.remember_for)
            .finish_non_exhaustive()
    }
}

impl PostModel {
    pub fn new(
        router: &TenantRouter,
        site_id: SiteId,
        caching: CachingPolicy,
        layer: Arc<dyn QueryLayer>,
    ) -> Self {
        let tenant = router.resolve(site_id);
        let remember_for = caching.remember_for();
        let table = tenant.table(Table::Posts);
        debug!(site_id = %site_id, table = %table, caching = caching.is_enabled(), "post model bound");

        Self {
            meta: MetaStore::new(Arc::clone(&layer)).with_remember(remember_for),
            users: UserModel::new(tenant.namespace().clone(), remember_for, Arc::clone(&layer)),
            tenant,
            table,
            layer,
            remember_for,
        }
    }

    pub fn from_config(config: &KoseligConfig, site_id: SiteId, layer: Arc<dyn QueryLayer>) -> Self {
        Self::new(&TenantRouter::from_config(config), site_id, config.caching, layer)
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn users(&self) -> &UserModel {
        &self.users
    }

    /// A query against this model's table with the published scope applied.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.table.clone())
            .with_global_scope(published_scope())
            .remember(self.remember_for)
    }

    /// Run a query built from [`PostModel::query`].
    pub fn get(&self, query: QueryBuilder) -> KoseligResult<Vec<PostRecord>> {
        select_as(self.layer.as_ref(), &query.build())
    }

    pub fn first(&self, query: QueryBuilder) -> KoseligResult<Option<PostRecord>> {
        Ok(self.get(query.limit(1))?.into_iter().next())
    }

    pub fn find(&self, id: PostId) -> KoseligResult<Option<PostRecord>> {
        self.first(self.query().where_eq("ID", id))
    }

    pub fn find_by_slug(&self, slug: &str) -> KoseligResult<Option<PostRecord>> {
        self.first(self.query().where_eq("post_name", slug))
    }

    pub fn all(&self) -> KoseligResult<Vec<PostRecord>> {
        self.get(self.query())
    }

    pub fn meta_owner(&self, post_id: PostId) -> MetaOwner {
        MetaOwner::post(post_id, self.tenant.namespace().clone())
    }

    pub fn meta_store(&self) -> &MetaStore {
        &self.meta
    }

    /// Meta of `post_id`, shaped like `selection`. A missing single key is
    /// `MetaValue::One(None)`.
    pub fn get_meta(
        &self,
        cache: &MetaCache,
        post_id: PostId,
        selection: &KeySelection,
    ) -> KoseligResult<MetaValue> {
        cache.lookup(&self.meta_owner(post_id), &self.meta, selection)
    }

    /// Custom fields of `post_id`, shaped like `selection`.
    pub fn get_acf(
        &self,
        cache: &MetaCache,
        resolver: &FieldResolver,
        post_id: PostId,
        selection: &KeySelection,
        format: bool,
    ) -> KoseligResult<ResolvedFields> {
        resolver.resolve(cache, &self.meta_owner(post_id), &self.meta, selection, format)
    }

    /// Featured image id, if set and numeric.
    pub fn thumbnail_id(&self, cache: &MetaCache, post_id: PostId) -> KoseligResult<Option<PostId>> {
        let raw = cache.get_one(&self.meta_owner(post_id), &self.meta, THUMBNAIL_META_KEY)?;
        Ok(raw.and_then(|v| v.trim().parse().ok()))
    }

    pub fn author(&self, post: &PostRecord) -> KoseligResult<Option<UserRecord>> {
        if post.post_author == 0 {
            return Ok(None);
        }
        self.users.find(post.post_author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use koselig_core::{MetaKind, MetaRecord, PostStatus};
    use koselig_storage::{MockStorage, PUBLISHED_SCOPE};

    fn seeded(storage: &MockStorage, table: &str) {
        storage
            .insert_post(table, &PostRecord::new(1, "hello", PostStatus::Publish))
            .unwrap();
        storage
            .insert_post(table, &PostRecord::new(2, "wip", PostStatus::Draft))
            .unwrap();
    }

    #[test]
    fn test_primary_site_uses_base_table() {
        let router = TenantRouter::new("wp_", true);
        let model = PostModel::new(&router, SiteId::PRIMARY, CachingPolicy::Disabled, Arc::new(MockStorage::new()));
        assert_eq!(model.table(), "wp_posts");
        assert_eq!(model.users().table(), "wp_users");
    }

    #[test]
    fn test_routed_site_tables() {
        let router = TenantRouter::new("wp_", true);
        let model = PostModel::new(&router, SiteId(7), CachingPolicy::Disabled, Arc::new(MockStorage::new()));
        assert_eq!(model.table(), "wp_7_posts");
        assert_eq!(model.meta_owner(1).table(), "wp_7_postmeta");
        assert_eq!(model.users().table(), "wp_users");
    }

    #[test]
    fn test_published_scope_default_and_lifted() {
        let storage = Arc::new(MockStorage::new());
        seeded(&storage, "wp_posts");
        let model = PostModel::from_config(&KoseligConfig::default(), SiteId::PRIMARY, storage);

        assert!(model.find(2).unwrap().is_none());
        assert_eq!(model.all().unwrap().len(), 1);

        let draft = model
            .first(model.query().without_global_scope(PUBLISHED_SCOPE).where_eq("ID", 2u64))
            .unwrap()
            .unwrap();
        assert_eq!(draft.post_status, PostStatus::Draft);
    }

    #[test]
    fn test_find_by_slug() {
        let storage = Arc::new(MockStorage::new());
        seeded(&storage, "wp_posts");
        let model = PostModel::from_config(&KoseligConfig::default(), SiteId::PRIMARY, storage);
        assert_eq!(model.find_by_slug("hello").unwrap().map(|p| p.id), Some(1));
        assert!(model.find_by_slug("wip").unwrap().is_none());
    }

    #[test]
    fn test_thumbnail_id() {
        let storage = Arc::new(MockStorage::new());
        storage
            .insert_meta("wp_postmeta", MetaKind::Post, &MetaRecord::new(1, 1, THUMBNAIL_META_KEY, "88"))
            .unwrap();
        storage
            .insert_meta("wp_postmeta", MetaKind::Post, &MetaRecord::new(2, 2, THUMBNAIL_META_KEY, "none"))
            .unwrap();
        let model = PostModel::from_config(&KoseligConfig::default(), SiteId::PRIMARY, storage);
        let cache = MetaCache::new();

        assert_eq!(model.thumbnail_id(&cache, 1).unwrap(), Some(88));
        assert_eq!(model.thumbnail_id(&cache, 2).unwrap(), None);
        assert_eq!(model.thumbnail_id(&cache, 3).unwrap(), None);
    }

    #[test]
    fn test_remember_policy_flows_into_queries() {
        let model = PostModel::new(
            &TenantRouter::new("wp_", false),
            SiteId::PRIMARY,
            CachingPolicy::Minutes(5),
            Arc::new(MockStorage::new()),
        );
        let query = model.query().build();
        assert_eq!(query.remember_for, Some(Duration::from_secs(300)));
        assert_eq!(
            model.meta_store().query_for(&model.meta_owner(1)).remember_for,
            Some(Duration::from_secs(300))
        );
    }
}
