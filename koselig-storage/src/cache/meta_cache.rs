//! Per-unit-of-work memo cache of meta record sets.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use koselig_core::{KoseligResult, MetaRecord};

use super::tenant_key::MetaCacheKey;
use super::traits::{CacheStats, Counters};
use crate::meta::{KeySelection, MetaFetcher, MetaOwner, MetaValue};
use crate::meta_map::MetaMap;

/// Memoises every meta record of an owner after the first read.
///
/// An owner is fetched at most once per cache: later reads are served from
/// memory even if storage has changed since. Entries are replaced whole,
/// never patched, so concurrent first reads of the same owner leave one
/// complete record set behind (the last writer's).
///
/// Create one per request or unit of work and drop it afterwards.
#[derive(Debug, Default)]
pub struct MetaCache {
    entries: RwLock<HashMap<MetaCacheKey, Arc<[MetaRecord]>>>,
    counters: Counters,
}

impl MetaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of `owner`, fetching them through `fetcher` on first use.
    pub fn get<F>(&self, owner: &MetaOwner, fetcher: &F) -> KoseligResult<Arc<[MetaRecord]>>
    where
        F: MetaFetcher + ?Sized,
    {
        let key = owner.cache_key();

        if let Some(records) = self.entries.read()?.get(&key) {
            self.counters.hit();
            tracing::trace!(%key, "meta cache hit");
            return Ok(Arc::clone(records));
        }

        self.counters.miss();
        let fetched: Arc<[MetaRecord]> = fetcher.fetch_all(owner)?.into();
        tracing::debug!(%key, records = fetched.len(), "meta cache populated");

        self.entries.write()?.insert(key, Arc::clone(&fetched));
        Ok(fetched)
    }

    /// Value of the first record whose key is `key`, in storage order.
    pub fn get_one<F>(
        &self,
        owner: &MetaOwner,
        fetcher: &F,
        key: &str,
    ) -> KoseligResult<Option<String>>
    where
        F: MetaFetcher + ?Sized,
    {
        let records = self.get(owner, fetcher)?;
        Ok(records
            .iter()
            .find(|r| r.meta_key == key)
            .map(|r| r.meta_value.clone()))
    }

    /// Records whose key is in `keys`, projected to a map. Duplicate keys
    /// resolve to the last record.
    pub fn get_many<F, K>(
        &self,
        owner: &MetaOwner,
        fetcher: &F,
        keys: &[K],
    ) -> KoseligResult<MetaMap>
    where
        F: MetaFetcher + ?Sized,
        K: AsRef<str>,
    {
        let records = self.get(owner, fetcher)?;
        Ok(project(
            records
                .iter()
                .filter(|r| keys.iter().any(|k| k.as_ref() == r.meta_key)),
        ))
    }

    /// Every record projected to a map. Duplicate keys resolve to the last
    /// record, unlike [`MetaCache::get_one`] which takes the first.
    pub fn get_key_value_map<F>(
        &self,
        owner: &MetaOwner,
        fetcher: &F,
    ) -> KoseligResult<MetaMap>
    where
        F: MetaFetcher + ?Sized,
    {
        let records = self.get(owner, fetcher)?;
        Ok(project(records.iter()))
    }

    /// Dispatch on `selection`: a single key yields a scalar, a key list or
    /// `All` yields a map.
    pub fn lookup<F>(
        &self,
        owner: &MetaOwner,
        fetcher: &F,
        selection: &KeySelection,
    ) -> KoseligResult<MetaValue>
    where
        F: MetaFetcher + ?Sized,
    {
        Ok(match selection {
            KeySelection::One(key) => MetaValue::One(self.get_one(owner, fetcher, key)?),
            KeySelection::Many(keys) => MetaValue::Map(self.get_many(owner, fetcher, keys)?),
            KeySelection::All => MetaValue::Map(self.get_key_value_map(owner, fetcher)?),
        })
    }

    /// Returns true if `owner` has already been fetched.
    pub fn contains(&self, owner: &MetaOwner) -> KoseligResult<bool> {
        Ok(self.entries.read()?.contains_key(&owner.cache_key()))
    }

    pub fn len(&self) -> KoseligResult<usize> {
        Ok(self.entries.read()?.len())
    }

    pub fn is_empty(&self) -> KoseligResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> KoseligResult<CacheStats> {
        Ok(self.counters.snapshot(self.len()?))
    }
}

/// Storage order; a repeated key keeps its first position and last value.
fn project<'a>(records: impl Iterator<Item = &'a MetaRecord>) -> MetaMap {
    records
        .map(|r| (r.meta_key.clone(), r.meta_value.clone()))
        .collect()
}
