//! Common types and utilities shared across shardpool.
//!
//! This module contains fundamental primitives used throughout the
//! codebase:
//! - Configuration constants
//! - Error types
//! - Identifiers (BlockId, CoreId)
//! - The tick source used for eviction timestamps

pub mod config;
pub mod error;
mod block_id;
mod core_id;
mod tick;

pub use block_id::BlockId;
pub use core_id::CoreId;
pub use error::{Error, Result};
pub use tick::TickSource;
