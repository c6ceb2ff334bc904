//! Users of the network.

use std::sync::Arc;
use std::time::Duration;

use koselig_core::{KoseligResult, Table, UserId, UserRecord};
use koselig_storage::{
    select_as, KeySelection, MetaCache, MetaOwner, MetaStore, MetaValue, QueryBuilder, QueryLayer,
    StorageNamespace,
};

/// Facade over the users table.
///
/// Users and their meta live in network-wide tables, so every site's model
/// reads the same rows. No visibility scope applies.
#[derive(Clone)]
pub struct UserModel {
    namespace: StorageNamespace,
    table: String,
    layer: Arc<dyn QueryLayer>,
    meta: MetaStore,
    remember_for: Option<Duration>,
}

impl std::fmt::Debug for UserModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserModel")
            .field("table", &self.table)
            .field("remember_for", &self.remember_for)
            .finish_non_exhaustive()
    }
}

impl UserModel {
    pub fn new(
        namespace: StorageNamespace,
        remember_for: Option<Duration>,
        layer: Arc<dyn QueryLayer>,
    ) -> Self {
        Self {
            table: namespace.table(Table::Users),
            meta: MetaStore::new(Arc::clone(&layer)).with_remember(remember_for),
            namespace,
            layer,
            remember_for,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.table.clone()).remember(self.remember_for)
    }

    pub fn find(&self, id: UserId) -> KoseligResult<Option<UserRecord>> {
        let query = self.query().where_eq("ID", id).limit(1).build();
        Ok(select_as(self.layer.as_ref(), &query)?.into_iter().next())
    }

    pub fn find_by_login(&self, login: &str) -> KoseligResult<Option<UserRecord>> {
        let query = self.query().where_eq("user_login", login).limit(1).build();
        Ok(select_as(self.layer.as_ref(), &query)?.into_iter().next())
    }

    pub fn meta_owner(&self, user_id: UserId) -> MetaOwner {
        MetaOwner::user(user_id, self.namespace.clone())
    }

    pub fn meta_store(&self) -> &MetaStore {
        &self.meta
    }

    /// Meta of `user_id`, shaped like `selection`.
    pub fn get_meta(
        &self,
        cache: &MetaCache,
        user_id: UserId,
        selection: &KeySelection,
    ) -> KoseligResult<MetaValue> {
        cache.lookup(&self.meta_owner(user_id), &self.meta, selection)
    }
}
