//! Meta side-table access.
//!
//! Meta records are always fetched as a complete set per owner: callers read
//! many keys of the same owner, so one query per owner beats one per key.
//! Subsets are filtered client-side.

use std::sync::Arc;
use std::time::Duration;

use koselig_core::{KoseligResult, MetaKind, MetaRecord, SiteId};

use crate::cache::MetaCacheKey;
use crate::meta_map::MetaMap;
use crate::query::{select_as, Query, QueryLayer};
use crate::tenant::StorageNamespace;

/// The entity a set of meta records belongs to, including where its meta
/// table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaOwner {
    kind: MetaKind,
    owner_id: u64,
    namespace: StorageNamespace,
}

impl MetaOwner {
    pub fn new(kind: MetaKind, owner_id: u64, namespace: StorageNamespace) -> Self {
        Self {
            kind,
            owner_id,
            namespace,
        }
    }

    pub fn post(post_id: u64, namespace: StorageNamespace) -> Self {
        Self::new(MetaKind::Post, post_id, namespace)
    }

    pub fn user(user_id: u64, namespace: StorageNamespace) -> Self {
        Self::new(MetaKind::User, user_id, namespace)
    }

    pub fn kind(&self) -> MetaKind {
        self.kind
    }

    pub fn owner_id(&self) -> u64 {
        self.owner_id
    }

    /// Fully qualified meta table name.
    pub fn table(&self) -> String {
        self.namespace.table(self.kind.table())
    }

    /// Site owning the physical meta table.
    pub fn site_id(&self) -> SiteId {
        self.namespace.site_for(self.kind.table())
    }

    pub fn cache_key(&self) -> MetaCacheKey {
        MetaCacheKey::new(self.namespace.base_prefix(), self.site_id(), self.kind, self.owner_id)
    }
}

/// Fetches every meta record of an owner.
pub trait MetaFetcher: Send + Sync {
    /// Return all records of `owner` in storage order.
    fn fetch_all(&self, owner: &MetaOwner) -> KoseligResult<Vec<MetaRecord>>;
}

/// [`MetaFetcher`] backed by a [`QueryLayer`].
#[derive(Clone)]
pub struct MetaStore {
    layer: Arc<dyn QueryLayer>,
    remember_for: Option<Duration>,
}

impl MetaStore {
    pub fn new(layer: Arc<dyn QueryLayer>) -> Self {
        Self {
            layer,
            remember_for: None,
        }
    }

    /// Let the query layer remember meta queries for `duration`.
    pub fn with_remember(mut self, duration: Option<Duration>) -> Self {
        self.remember_for = duration;
        self
    }

    /// Query for all meta of `owner`. Meta rows carry no status, so no
    /// global scope is attached.
    pub fn query_for(&self, owner: &MetaOwner) -> Query {
        Query::builder(owner.table())
            .where_eq(owner.kind().owner_column(), owner.owner_id())
            .remember(self.remember_for)
            .build()
    }
}

impl MetaFetcher for MetaStore {
    fn fetch_all(&self, owner: &MetaOwner) -> KoseligResult<Vec<MetaRecord>> {
        let query = self.query_for(owner);
        tracing::trace!(table = %query.table, owner_id = owner.owner_id(), "fetching meta");
        select_as(self.layer.as_ref(), &query)
    }
}

/// Which meta keys a caller wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelection {
    /// One key, scalar result.
    One(String),
    /// An explicit list of keys, mapping result.
    Many(Vec<String>),
    /// Every key the owner has, mapping result.
    All,
}

impl KeySelection {
    pub fn one(key: impl Into<String>) -> Self {
        KeySelection::One(key.into())
    }

    pub fn many<K: Into<String>>(keys: impl IntoIterator<Item = K>) -> Self {
        KeySelection::Many(keys.into_iter().map(Into::into).collect())
    }

    /// Returns true if `key` was named explicitly by the caller.
    pub fn names(&self, key: &str) -> bool {
        match self {
            KeySelection::One(k) => k == key,
            KeySelection::Many(keys) => keys.iter().any(|k| k == key),
            KeySelection::All => false,
        }
    }
}

impl From<&str> for KeySelection {
    fn from(key: &str) -> Self {
        KeySelection::one(key)
    }
}

impl From<String> for KeySelection {
    fn from(key: String) -> Self {
        KeySelection::One(key)
    }
}

impl From<Vec<String>> for KeySelection {
    fn from(keys: Vec<String>) -> Self {
        KeySelection::Many(keys)
    }
}

impl From<Vec<&str>> for KeySelection {
    fn from(keys: Vec<&str>) -> Self {
        KeySelection::many(keys)
    }
}

impl From<Option<&str>> for KeySelection {
    fn from(key: Option<&str>) -> Self {
        key.map(KeySelection::one).unwrap_or(KeySelection::All)
    }
}

/// Result of a meta lookup, shaped like the [`KeySelection`] that asked
/// for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    One(Option<String>),
    Map(MetaMap),
}

impl MetaValue {
    pub fn into_one(self) -> Option<String> {
        match self {
            MetaValue::One(value) => value,
            MetaValue::Map(_) => None,
        }
    }

    pub fn into_map(self) -> MetaMap {
        match self {
            MetaValue::One(_) => MetaMap::new(),
            MetaValue::Map(map) => map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantRouter;
    use crate::MockStorage;

    #[test]
    fn test_owner_table_follows_namespace() {
        let router = TenantRouter::new("wp_", true);
        let owner = MetaOwner::post(42, router.resolve_namespace(SiteId(7)));
        assert_eq!(owner.table(), "wp_7_postmeta");
        assert_eq!(owner.site_id(), SiteId(7));

        let user = MetaOwner::user(3, router.resolve_namespace(SiteId(7)));
        assert_eq!(user.table(), "wp_usermeta");
        assert_eq!(user.site_id(), SiteId::PRIMARY);
    }

    #[test]
    fn test_fetch_all_returns_every_key_in_order() {
        let storage = Arc::new(MockStorage::new());
        let ns = StorageNamespace::base("wp_");
        storage
            .insert_meta("wp_postmeta", MetaKind::Post, &MetaRecord::new(1, 42, "b", "2"))
            .unwrap();
        storage
            .insert_meta("wp_postmeta", MetaKind::Post, &MetaRecord::new(2, 42, "a", "1"))
            .unwrap();
        storage
            .insert_meta("wp_postmeta", MetaKind::Post, &MetaRecord::new(3, 43, "a", "x"))
            .unwrap();

        let store = MetaStore::new(storage.clone());
        let records = store.fetch_all(&MetaOwner::post(42, ns)).unwrap();

        let keys: Vec<_> = records.iter().map(|r| r.meta_key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(storage.query_count(), 1);
    }

    #[test]
    fn test_meta_query_has_no_status_filter() {
        let store = MetaStore::new(Arc::new(MockStorage::new()));
        let query = store.query_for(&MetaOwner::post(42, StorageNamespace::base("wp_")));
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].field, "post_id");
    }

    #[test]
    fn test_key_selection_names() {
        assert!(KeySelection::one("price").names("price"));
        assert!(!KeySelection::one("price").names("colour"));
        assert!(KeySelection::many(["price", "colour"]).names("colour"));
        assert!(!KeySelection::All.names("price"));
        assert_eq!(KeySelection::from(None::<&str>), KeySelection::All);
    }
}
