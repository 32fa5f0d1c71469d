//! `src/cache/stats.rs`
//! ============================================================================
//! # Cache Statistics
//!
//! Lock-free counters for monitoring and debugging, sampled into an owned
//! snapshot so readers never hold the store lock.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Per-cache counters. Production time is accumulated internally only to
/// derive the average exposed in the snapshot.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    productions: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
    production_time_ns: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[expect(clippy::cast_possible_truncation, reason = "Expected accuracy")]
    pub fn record_production(&self, duration: Duration, success: bool) {
        self.productions.fetch_add(1, Ordering::Relaxed);
        self.production_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);

        if !success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        let productions = self.productions.load(Ordering::Relaxed);
        let production_time_ns = self.production_time_ns.load(Ordering::Relaxed);

        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            productions,
            failures: self.failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            average_production_time: if productions > 0 {
                Duration::from_nanos(production_time_ns / productions)
            } else {
                Duration::ZERO
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub productions: u64,
    pub failures: u64,
    pub evictions: u64,
    pub average_production_time: Duration,
}

impl CacheStatsSnapshot {
    #[expect(clippy::cast_precision_loss, reason = "Expected precision loss")]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    #[expect(clippy::cast_precision_loss, reason = "Expected precision loss")]
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        if self.productions == 0 {
            0.0
        } else {
            self.failures as f64 / self.productions as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_arithmetic() {
        let stats = CacheStats::default();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        let snap = stats.snapshot();
        assert!((snap.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_production_time_averaging() {
        let stats = CacheStats::default();
        stats.record_production(Duration::from_millis(10), true);
        stats.record_production(Duration::from_millis(20), false);

        let snap = stats.snapshot();
        assert_eq!(snap.productions, 2);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.average_production_time, Duration::from_millis(15));
    }
}
