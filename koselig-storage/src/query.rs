//! Query descriptions and the query-layer seam.
//!
//! The relational mapping layer itself lives outside this workspace; it is
//! reached through [`QueryLayer`], which takes a [`Query`] and returns raw
//! rows. Queries are built with [`QueryBuilder`], which carries a list of
//! named global scopes that are applied on every build unless removed.

use std::sync::Arc;
use std::time::Duration;

use koselig_core::{FilterExpr, KoseligError, KoseligResult, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// A single row as returned by the query layer.
pub type Row = serde_json::Value;

/// Name of the scope restricting posts to published ones.
pub const PUBLISHED_SCOPE: &str = "published";

/// Status value a post must carry to be visible by default.
pub const PUBLISHED_STATUS: &str = "publish";

/// A predicate that is conjoined onto every query unless explicitly lifted.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalScope {
    name: &'static str,
    filter: FilterExpr,
}

impl GlobalScope {
    pub fn new(name: &'static str, filter: FilterExpr) -> Self {
        Self { name, filter }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn filter(&self) -> &FilterExpr {
        &self.filter
    }
}

/// The default visibility scope for posts: `post_status = 'publish'`.
pub fn published_scope() -> GlobalScope {
    GlobalScope::new(
        PUBLISHED_SCOPE,
        FilterExpr::eq("post_status", PUBLISHED_STATUS),
    )
}

/// A fully built query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub table: String,
    pub filters: Vec<FilterExpr>,
    pub limit: Option<usize>,
    /// How long the query layer may remember the result. Not part of the
    /// query's shape.
    #[serde(skip)]
    pub remember_for: Option<Duration>,
}

impl Query {
    pub fn builder(table: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(table)
    }

    /// Returns true if `row` satisfies every filter.
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Stable identifier of this query's shape (table, filters, limit),
    /// hex-encoded SHA-256.
    pub fn shape_key(&self) -> String {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        hex::encode(hasher.finalize())
    }
}

/// Builder for [`Query`] with support for removable global scopes.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    filters: Vec<FilterExpr>,
    scopes: Vec<GlobalScope>,
    limit: Option<usize>,
    remember_for: Option<Duration>,
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            scopes: Vec::new(),
            limit: None,
            remember_for: None,
        }
    }

    /// Register a global scope. A scope with the same name replaces the
    /// earlier one.
    pub fn with_global_scope(mut self, scope: GlobalScope) -> Self {
        self.scopes.retain(|s| s.name != scope.name);
        self.scopes.push(scope);
        self
    }

    /// Lift a global scope for this query only.
    pub fn without_global_scope(mut self, name: &str) -> Self {
        self.scopes.retain(|s| s.name != name);
        self
    }

    /// Lift every global scope for this query only.
    pub fn without_global_scopes(mut self) -> Self {
        self.scopes.clear();
        self
    }

    pub fn has_global_scope(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.name == name)
    }

    pub fn filter(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filter(FilterExpr::eq(field, value))
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Allow the query layer to remember the result for `duration`.
    pub fn remember(mut self, duration: Option<Duration>) -> Self {
        self.remember_for = duration;
        self
    }

    pub fn build(self) -> Query {
        let mut filters = self.filters;
        filters.extend(self.scopes.into_iter().map(|s| s.filter));
        Query {
            table: self.table,
            filters,
            limit: self.limit,
            remember_for: self.remember_for,
        }
    }
}

/// The external data-access layer.
pub trait QueryLayer: Send + Sync {
    /// Run `query` and return matching rows in storage order.
    fn select(&self, query: &Query) -> KoseligResult<Vec<Row>>;
}

impl<T: QueryLayer + ?Sized> QueryLayer for Arc<T> {
    fn select(&self, query: &Query) -> KoseligResult<Vec<Row>> {
        (**self).select(query)
    }
}

/// Run `query` and decode each row into `T`.
pub fn select_as<T, L>(layer: &L, query: &Query) -> KoseligResult<Vec<T>>
where
    T: DeserializeOwned,
    L: QueryLayer + ?Sized,
{
    layer
        .select(query)?
        .into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| {
                KoseligError::from(StorageError::DecodeFailed {
                    table: query.table.clone(),
                    reason: e.to_string(),
                })
            })
        })
        .collect()
}
