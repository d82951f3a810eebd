//! Block devices - the I/O primitive consumed by the buffer cache.
//!
//! The cache does not know or care what is behind a block: it calls
//! [`BlockDevice::read_block`] to fill an invalid slot and
//! [`BlockDevice::write_block`] to write one through. Implementations:
//! - [`MemDevice`] - in-memory device for tests and ephemeral use
//! - [`FileDevice`] - a fixed-capacity file-backed disk image

mod file;
mod mem;

pub use file::FileDevice;
pub use mem::MemDevice;

use crate::cache::BlockData;
use crate::common::{BlockId, Result};

/// Synchronous read/write of one block-sized unit.
///
/// Transfers are whole blocks; no partial-transfer semantics exist. A
/// call returns only once the transfer is complete, so the cache can mark
/// a slot valid the moment `read_block` returns.
///
/// # Thread Safety
/// Methods take `&self`: the cache issues I/O for different slots
/// concurrently, each under that slot's content lock. Implementations
/// serialize internally as needed.
pub trait BlockDevice: Send + Sync {
    /// Read the named block into `buf`.
    ///
    /// # Errors
    /// - `Error::BlockOutOfRange` if the device has no such block
    /// - `Error::Io` on transport failure
    fn read_block(&self, id: BlockId, buf: &mut BlockData) -> Result<()>;

    /// Write `buf` to the named block.
    ///
    /// # Errors
    /// - `Error::BlockOutOfRange` if the device has no such block
    /// - `Error::Io` on transport failure
    fn write_block(&self, id: BlockId, buf: &BlockData) -> Result<()>;
}
