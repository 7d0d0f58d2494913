//! Pipeline counters, used for observability and by tests asserting cache
//! behavior.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for the artifact cache tiers.
#[derive(Debug, Default)]
pub struct CacheStats {
    memory_hits: AtomicU64,
    store_hits: AtomicU64,
    synthesized: AtomicU64,
}

impl CacheStats {
    pub fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_hit(&self) {
        self.store_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_synthesis(&self) {
        self.synthesized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
            synthesized: self.synthesized.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Requests served from the in-memory loaded-type map.
    pub memory_hits: u64,
    /// Requests served by loading a previously compiled artifact from
    /// durable storage.
    pub store_hits: u64,
    /// Requests that ran the full synthesize/compile/load pipeline.
    pub synthesized: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = CacheStats::default();
        stats.record_memory_hit();
        stats.record_memory_hit();
        stats.record_store_hit();
        stats.record_synthesis();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                memory_hits: 2,
                store_hits: 1,
                synthesized: 1,
            }
        );
    }
}
