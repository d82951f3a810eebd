//! Buffer cache: a fixed slot arena sharded over hash buckets.
//!
//! The cache maps `(device, block)` identities onto a fixed pool of
//! content-locked slots. Hot-path lookups touch only the one bucket the
//! identity hashes to; misses fall back to a serialized search that
//! recycles the least-recently-released unreferenced slot anywhere in
//! the arena, migrating it between buckets when needed.

mod data;
mod guard;
mod slot;
mod stats;
mod table;

pub use data::BlockData;
pub use guard::{PinToken, SlotGuard};
pub use slot::SlotId;
pub use stats::{CacheSnapshot, CacheStats};
pub use table::BufferCache;
