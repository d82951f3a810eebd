//! Monotonic tick counter.

use std::sync::atomic::{AtomicU64, Ordering};

/// A process-wide monotonically non-decreasing tick counter.
///
/// The buffer cache samples this to timestamp slot releases; eviction
/// prefers the smallest stamp. In a kernel the counter is advanced by the
/// timer interrupt; here whoever owns the `TickSource` calls
/// [`TickSource::advance`] at whatever cadence it likes. The cache only
/// ever reads it.
///
/// `Relaxed` ordering is sufficient: ticks order evictions approximately,
/// they synchronize nothing.
///
/// # Example
/// ```
/// use shardpool::TickSource;
///
/// let ticks = TickSource::new();
/// assert_eq!(ticks.now(), 0);
/// ticks.advance();
/// assert_eq!(ticks.now(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TickSource {
    ticks: AtomicU64,
}

impl TickSource {
    /// Create a new tick source starting at zero.
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Read the current tick.
    #[inline]
    pub fn now(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Advance the counter by one tick. Returns the new value.
    #[inline]
    pub fn advance(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }
}
