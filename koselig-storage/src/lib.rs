//! Koselig Storage - Query Seam, Tenant Routing and Meta Caches
//!
//! Everything between the models and the external data-access layer:
//! the [`QueryLayer`] seam and its in-memory [`MockStorage`], the
//! [`TenantRouter`], the [`MetaStore`], and the two cache tiers.

pub mod cache;
pub mod meta;
pub mod meta_map;
pub mod query;
pub mod tenant;

pub use cache::{CacheStats, MetaCache, MetaCacheKey, RememberCache};
pub use meta::{KeySelection, MetaFetcher, MetaOwner, MetaStore, MetaValue};
pub use meta_map::MetaMap;
pub use query::{
    published_scope, select_as, GlobalScope, Query, QueryBuilder, QueryLayer, Row,
    PUBLISHED_SCOPE, PUBLISHED_STATUS,
};
pub use tenant::{StorageNamespace, TenantContext, TenantRouter, SITE_SEPARATOR};

use koselig_core::{KoseligResult, MetaKind, MetaRecord, PostRecord, UserRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

// ============================================================================
// MOCK STORAGE
// ============================================================================

/// In-memory query layer for tests and fixtures.
///
/// Tables are created on first insert. Rows keep insertion order, which is
/// the order `select` returns them in.
#[derive(Debug, Default)]
pub struct MockStorage {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    queries: AtomicUsize,
}

impl MockStorage {
    /// Create a new mock storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw row to `table`.
    pub fn insert_row(&self, table: &str, row: Row) -> KoseligResult<()> {
        self.tables
            .write()?
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    pub fn insert_post(&self, table: &str, post: &PostRecord) -> KoseligResult<()> {
        self.insert_row(table, encode(table, post)?)
    }

    pub fn insert_user(&self, table: &str, user: &UserRecord) -> KoseligResult<()> {
        self.insert_row(table, encode(table, user)?)
    }

    pub fn insert_meta(&self, table: &str, kind: MetaKind, meta: &MetaRecord) -> KoseligResult<()> {
        self.insert_row(table, meta.to_row(kind))
    }

    /// Number of rows stored in `table`.
    pub fn row_count(&self, table: &str) -> KoseligResult<usize> {
        Ok(self.tables.read()?.get(table).map(Vec::len).unwrap_or(0))
    }

    /// Number of `select` calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Clear all stored data.
    pub fn clear(&self) -> KoseligResult<()> {
        self.tables.write()?.clear();
        Ok(())
    }
}

fn encode<T: serde::Serialize>(table: &str, value: &T) -> KoseligResult<Row> {
    serde_json::to_value(value).map_err(|e| {
        koselig_core::StorageError::QueryFailed {
            table: table.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

impl QueryLayer for MockStorage {
    fn select(&self, query: &Query) -> KoseligResult<Vec<Row>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read()?;
        let rows = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.matches(row))
                    .take(query.limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use koselig_core::PostStatus;

    #[test]
    fn test_select_filters_and_limits() {
        let storage = MockStorage::new();
        for id in 1..=3 {
            storage
                .insert_post("wp_posts", &PostRecord::new(id, format!("p{id}"), PostStatus::Publish))
                .unwrap();
        }

        let all = storage.select(&Query::builder("wp_posts").build()).unwrap();
        assert_eq!(all.len(), 3);

        let limited = storage
            .select(&Query::builder("wp_posts").limit(2).build())
            .unwrap();
        assert_eq!(limited.len(), 2);

        let one: Vec<PostRecord> =
            select_as(&storage, &Query::builder("wp_posts").where_eq("post_name", "p2").build())
                .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].id, 2);
        assert_eq!(storage.query_count(), 3);
    }

    #[test]
    fn test_unknown_table_is_empty() {
        let storage = MockStorage::new();
        assert!(storage
            .select(&Query::builder("wp_9_posts").build())
            .unwrap()
            .is_empty());
        assert_eq!(storage.row_count("wp_9_posts").unwrap(), 0);
    }

    #[test]
    fn test_select_as_reports_decode_failures() {
        let storage = MockStorage::new();
        storage
            .insert_row("wp_posts", serde_json::json!({"ID": "not a number"}))
            .unwrap();

        let result: KoseligResult<Vec<PostRecord>> =
            select_as(&storage, &Query::builder("wp_posts").build());
        assert!(matches!(
            result,
            Err(koselig_core::KoseligError::Storage(
                koselig_core::StorageError::DecodeFailed { .. }
            ))
        ));
    }

    #[test]
    fn test_clear() {
        let storage = MockStorage::new();
        storage.insert_row("t", serde_json::json!({})).unwrap();
        storage.clear().unwrap();
        assert_eq!(storage.row_count("t").unwrap(), 0);
    }
}
