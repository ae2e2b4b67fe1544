//! Cache Statistics Module
//!
//! Tracks cache effectiveness: hits, misses, stores and expirations.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned a fresh entry
    pub hits: u64,
    /// Lookups that found nothing or a stale entry
    pub misses: u64,
    /// Successful store operations
    pub stores: u64,
    /// Entries removed for staleness, lazily or by a sweep
    pub expirations: u64,
    /// Current number of entries in the index
    pub total_entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by every caller of a store.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    expirations: AtomicU64,
}

impl StatsRecorder {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            total_entries,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = StatsRecorder::default().snapshot(0);
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let recorder = StatsRecorder::default();
        recorder.record_hit();
        recorder.record_hit();
        recorder.record_hit();
        assert_eq!(recorder.snapshot(1).hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let recorder = StatsRecorder::default();
        recorder.record_hit();
        recorder.record_miss();
        assert_eq!(recorder.snapshot(1).hit_rate(), 0.5);
    }

    #[test]
    fn test_snapshot_counts() {
        let recorder = StatsRecorder::default();
        recorder.record_store();
        recorder.record_store();
        recorder.record_expirations(3);

        let stats = recorder.snapshot(42);
        assert_eq!(stats.stores, 2);
        assert_eq!(stats.expirations, 3);
        assert_eq!(stats.total_entries, 42);
    }
}
