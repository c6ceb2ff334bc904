//! Hit/miss accounting shared by both cache tiers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    /// Lookups that went to the layer below.
    pub misses: u64,
    /// Owners (memo cache) or query shapes (remember cache) held.
    pub entries: u64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Share of lookups served from memory, `None` before the first lookup.
    pub fn hit_ratio(&self) -> Option<f64> {
        match self.lookups() {
            0 => None,
            n => Some(self.hits as f64 / n as f64),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            entries: 1,
        };
        assert_eq!(stats.lookups(), 4);
        assert_eq!(stats.hit_ratio(), Some(0.75));
        assert_eq!(CacheStats::default().hit_ratio(), None);
    }

    #[test]
    fn test_snapshot_reads_counters() {
        let counters = Counters::default();
        counters.miss();
        counters.hit();
        counters.hit();
        assert_eq!(
            counters.snapshot(5),
            CacheStats {
                hits: 2,
                misses: 1,
                entries: 5
            }
        );
    }
}
