//! Frame pool statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracking frame pool behavior.
///
/// Counters are updated with relaxed atomics on the hot path; a
/// [`PoolSnapshot`] gives a consistent-enough point-in-time copy for
/// reporting.
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Successful allocations (local and stolen).
    pub allocated: AtomicU64,

    /// Frames returned to a free list.
    pub freed: AtomicU64,

    /// Steal events: local shard empty, another shard donated.
    pub steals: AtomicU64,

    /// Total frames moved by steal events (including the one handed to
    /// the allocator).
    pub frames_stolen: AtomicU64,

    /// Allocations that found every shard empty.
    pub exhausted: AtomicU64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            allocated: self.allocated.load(Ordering::Relaxed),
            freed: self.freed.load(Ordering::Relaxed),
            steals: self.steals.load(Ordering::Relaxed),
            frames_stolen: self.frames_stolen.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.allocated.store(0, Ordering::Relaxed);
        self.freed.store(0, Ordering::Relaxed);
        self.steals.store(0, Ordering::Relaxed);
        self.frames_stolen.store(0, Ordering::Relaxed);
        self.exhausted.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`PoolStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub allocated: u64,
    pub freed: u64,
    pub steals: u64,
    pub frames_stolen: u64,
    pub exhausted: u64,
}

impl PoolSnapshot {
    /// Frames currently held by allocators.
    pub fn in_use(&self) -> u64 {
        self.allocated - self.freed
    }
}

impl fmt::Display for PoolSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pool {{ allocated: {}, freed: {}, in_use: {}, steals: {}, frames_stolen: {}, exhausted: {} }}",
            self.allocated,
            self.freed,
            self.in_use(),
            self.steals,
            self.frames_stolen,
            self.exhausted,
        )
    }
}
