//! Duration-based query result cache.
//!
//! Wraps any [`QueryLayer`]. Queries that carry a `remember_for` duration
//! are answered from memory while the stored result is younger than that
//! duration; all other queries pass straight through.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use koselig_core::KoseligResult;

use super::traits::{CacheStats, Counters};
use crate::query::{Query, QueryLayer, Row};

#[derive(Debug, Clone)]
struct Remembered {
    rows: Vec<Row>,
    cached_at: DateTime<Utc>,
}

impl Remembered {
    fn staleness(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Query layer decorator remembering results by query shape.
#[derive(Debug)]
pub struct RememberCache<Q> {
    inner: Q,
    entries: RwLock<HashMap<String, Remembered>>,
    counters: Counters,
}

impl<Q: QueryLayer> RememberCache<Q> {
    pub fn new(inner: Q) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    pub fn inner(&self) -> &Q {
        &self.inner
    }

    /// Drop every remembered result older than `max_age`.
    ///
    /// Expired entries are otherwise only replaced on the next query with
    /// the same shape.
    pub fn purge_older_than(&self, max_age: Duration) -> KoseligResult<usize> {
        let mut entries = self.entries.write()?;
        let before = entries.len();
        entries.retain(|_, e| e.staleness() <= max_age);
        Ok(before - entries.len())
    }

    pub fn stats(&self) -> KoseligResult<CacheStats> {
        Ok(self.counters.snapshot(self.entries.read()?.len()))
    }
}

impl<Q: QueryLayer> QueryLayer for RememberCache<Q> {
    fn select(&self, query: &Query) -> KoseligResult<Vec<Row>> {
        let Some(max_staleness) = query.remember_for else {
            return self.inner.select(query);
        };

        let key = query.shape_key();
        if let Some(entry) = self.entries.read()?.get(&key) {
            if entry.staleness() <= max_staleness {
                self.counters.hit();
                tracing::trace!(table = %query.table, "remembered query hit");
                return Ok(entry.rows.clone());
            }
        }

        self.counters.miss();
        let rows = self.inner.select(query)?;
        tracing::debug!(
            table = %query.table,
            rows = rows.len(),
            remember_secs = max_staleness.as_secs(),
            "remembering query result"
        );
        self.entries.write()?.insert(
            key,
            Remembered {
                rows: rows.clone(),
                cached_at: Utc::now(),
            },
        );
        Ok(rows)
    }
}
