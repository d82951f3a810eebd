//! Buffer cache statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by the buffer cache.
///
/// All fields are atomic for lock-free, thread-safe updates; counters
/// use `Ordering::Relaxed` because statistics only need atomicity, not
/// synchronization with each other.
///
/// # Example
/// ```
/// use shardpool::cache::CacheStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = CacheStats::new();
/// stats.hits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.hits.load(Ordering::Relaxed), 1);
/// ```
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Acquires satisfied by the fast-path bucket scan. An acquire that
    /// only hits in the slow-path re-check stays counted as a miss.
    pub hits: AtomicU64,

    /// Acquires that entered the slow-path eviction search.
    pub misses: AtomicU64,

    /// Slots recycled under a new block identity.
    pub evictions: AtomicU64,

    /// Evictions that moved the slot into a different bucket.
    pub migrations: AtomicU64,

    /// Blocks fetched from the device.
    pub device_reads: AtomicU64,

    /// Blocks written through to the device.
    pub device_writes: AtomicU64,
}

impl CacheStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Get a non-atomic snapshot for display or comparison.
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            migrations: self.migrations.load(Ordering::Relaxed),
            device_reads: self.device_reads.load(Ordering::Relaxed),
            device_writes: self.device_writes.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.migrations.store(0, Ordering::Relaxed);
        self.device_reads.store(0, Ordering::Relaxed);
        self.device_writes.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub migrations: u64,
    pub device_reads: u64,
    pub device_writes: u64,
}

impl CacheSnapshot {
    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cache {{ hits: {}, misses: {}, evictions: {}, migrations: {}, hit_rate: {:.2}% }}",
            self.hits,
            self.misses,
            self.evictions,
            self.migrations,
            self.hit_rate() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits.load(Ordering::Relaxed), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats::new();
        stats.hits.fetch_add(3, Ordering::Relaxed);
        stats.misses.fetch_add(1, Ordering::Relaxed);
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_snapshot() {
        let stats = CacheStats::new();
        stats.evictions.fetch_add(2, Ordering::Relaxed);
        stats.migrations.fetch_add(1, Ordering::Relaxed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.evictions, 2);
        assert_eq!(snapshot.migrations, 1);
    }

    #[test]
    fn test_reset() {
        let stats = CacheStats::new();
        stats.hits.fetch_add(100, Ordering::Relaxed);
        stats.reset();
        assert_eq!(stats.hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_display() {
        let stats = CacheStats::new();
        stats.hits.fetch_add(8, Ordering::Relaxed);
        stats.misses.fetch_add(2, Ordering::Relaxed);

        let display = format!("{}", stats.snapshot());
        assert!(display.contains("hits: 8"));
        assert!(display.contains("80.00%"));
    }
}
