//! Cache Statistics Module
//!
//! Tracks range hits, misses, populations and sweeper reclamations. Counters
//! are atomics because the engine is shared across handlers without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Live counters owned by the cache engine.
#[derive(Debug, Default)]
pub struct CacheStats {
    range_hits: AtomicU64,
    range_misses: AtomicU64,
    populations: AtomicU64,
    reclaimed: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Range reads answered from the cache
    pub range_hits: u64,
    /// Range reads that found nothing usable
    pub range_misses: u64,
    /// Successful range populations
    pub populations: u64,
    /// Cache locations reclaimed by the sweeper
    pub reclaimed: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.range_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.range_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_population(&self) {
        self.populations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reclaimed(&self, count: u64) {
        self.reclaimed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            range_hits: self.range_hits.load(Ordering::Relaxed),
            range_misses: self.range_misses.load(Ordering::Relaxed),
            populations: self.populations.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no range reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.range_hits + self.range_misses;
        if total == 0 {
            0.0
        } else {
            self.range_hits as f64 / total as f64
        }
    }
}
