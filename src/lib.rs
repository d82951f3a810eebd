//! # shardpool
//!
//! Contention-sharded resource managers: a hash-bucketed block cache and
//! a per-core page-frame pool. Both serve many cores from one fixed
//! arena by splitting the lock that would otherwise serialize them into
//! many short-hold shard locks, and both fall back to a cross-shard path
//! (eviction search, work stealing) when the local shard runs dry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           shardpool                             │
//! │                                                                 │
//! │  ┌───────────────────────────┐  ┌───────────────────────────┐  │
//! │  │        BufferCache        │  │         FramePool         │  │
//! │  │  buckets ──▶ slot arena   │  │  shards ──▶ frame arena   │  │
//! │  │  SlotGuard / PinToken     │  │  FrameRef                 │  │
//! │  │  serialized eviction +    │  │  half-list work stealing  │  │
//! │  │  bucket migration         │  │                           │  │
//! │  └─────────────┬─────────────┘  └───────────────────────────┘  │
//! │                │                                                │
//! │  ┌─────────────▼─────────────┐  ┌───────────────────────────┐  │
//! │  │     BlockDevice trait     │  │          common           │  │
//! │  │   MemDevice, FileDevice   │  │  BlockId, CoreId, ticks,  │  │
//! │  │                           │  │  config, errors           │  │
//! │  └───────────────────────────┘  └───────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```
//! use shardpool::{BlockId, BufferCache, CoreId, FramePool, MemDevice, TickSource};
//! use std::sync::Arc;
//!
//! // Block cache over an in-memory device.
//! let cache = BufferCache::with_defaults(MemDevice::new(), Arc::new(TickSource::new()));
//! let mut block = cache.read(BlockId::new(1, 0))?;
//! block.as_mut_slice()[0] = 0xAB;
//! block.write()?;
//! drop(block);
//!
//! // Frame pool with four core shards.
//! let pool = FramePool::new(64, 4);
//! pool.populate(CoreId::new(0), 64);
//! let frame = pool.allocate(CoreId::new(0)).unwrap();
//! pool.free(CoreId::new(0), frame);
//! # Ok::<(), shardpool::Error>(())
//! ```

pub mod alloc;
pub mod cache;
pub mod common;
pub mod device;

pub use alloc::{FrameId, FramePool, FrameRef, PoolSnapshot};
pub use cache::{BlockData, BufferCache, CacheSnapshot, PinToken, SlotGuard, SlotId};
pub use common::config::{BLOCK_SIZE, FRAME_SIZE};
pub use common::{BlockId, CoreId, Error, Result, TickSource};
pub use device::{BlockDevice, FileDevice, MemDevice};
