//! Configuration constants for shardpool.

/// Size of a cached disk block in bytes (1KB).
///
/// This is the unit of transfer between the buffer cache and a block
/// device. 1KB matches classic Unix file-system block sizes and keeps the
/// slot arena small relative to the frame size.
pub const BLOCK_SIZE: usize = 1024;

/// Size of a physical frame in bytes (4KB).
///
/// Chosen to match the hardware page size on most systems. The frame pool
/// hands out whole frames; the caller owns the full 4KB until it frees it.
pub const FRAME_SIZE: usize = 4096;

/// Default number of slots in the buffer cache arena.
///
/// The classic sizing rule is three blocks per in-flight file-system
/// operation; 30 slots covers ten concurrent operations.
pub const DEFAULT_SLOTS: usize = 30;

/// Default number of hash buckets in the buffer cache.
///
/// Prime, so `(device + block) % DEFAULT_BUCKETS` spreads sequential block
/// numbers across buckets instead of clustering them.
pub const DEFAULT_BUCKETS: usize = 17;

/// Default number of frame-pool shards (one per execution core).
pub const DEFAULT_SHARDS: usize = 8;

/// Byte pattern written over a frame when it is freed.
///
/// Dangling references to freed frames read this junk instead of stale
/// contents, which turns use-after-free bugs into loud test failures.
pub const FILL_FREED: u8 = 0x01;

/// Byte pattern written over a frame when it is handed to a caller.
pub const FILL_ALLOCATED: u8 = 0x05;
