//! Execution-core identifier type.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies the execution core (and therefore the frame-pool shard)
/// on whose behalf an operation runs.
///
/// Using `usize` because shard tables are `Vec`s and the id indexes them
/// directly. In a kernel this would come from `cpuid()` with preemption
/// disabled; in a process it is whatever stable index the caller's thread
/// model provides. All shard-local operations take it explicitly so tests
/// can pin work to a chosen shard.
///
/// # Example
/// ```
/// use shardpool::CoreId;
///
/// let core = CoreId::new(3);
/// assert_eq!(core.0, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoreId(pub usize);

impl CoreId {
    /// Create a new CoreId.
    #[inline]
    pub fn new(id: usize) -> Self {
        CoreId(id)
    }

    /// Derive a CoreId for the calling thread in a pool of `shards`
    /// shards.
    ///
    /// Hashes the thread id, so a given thread always lands on the same
    /// shard. This is the explicit execution-context accessor for callers
    /// that have no core identity of their own.
    pub fn of_current_thread(shards: usize) -> Self {
        assert!(shards > 0, "shard count must be > 0");
        let mut hasher = DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        CoreId(hasher.finish() as usize % shards)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Core({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_id_new() {
        let core = CoreId::new(5);
        assert_eq!(core.0, 5);
    }

    #[test]
    fn test_core_id_display() {
        assert_eq!(format!("{}", CoreId::new(2)), "Core(2)");
    }

    #[test]
    fn test_of_current_thread_stable() {
        let a = CoreId::of_current_thread(4);
        let b = CoreId::of_current_thread(4);
        assert_eq!(a, b);
        assert!(a.0 < 4);
    }

    #[test]
    fn test_of_current_thread_in_range() {
        for shards in 1..16 {
            assert!(CoreId::of_current_thread(shards).0 < shards);
        }
    }
}
