//! Frame pool: a per-core sharded page-frame allocator.
//!
//! Frames live in a fixed arena and move between per-core free lists
//! and [`FrameRef`] holders. Allocation is contention-free while a
//! core's own list has frames; when it runs dry, the core steals the
//! larger half of the first non-empty neighbor's list.

mod frame;
mod pool;
mod stats;

pub use frame::{FrameData, FrameId, FrameRef};
pub use pool::FramePool;
pub use stats::{PoolSnapshot, PoolStats};
