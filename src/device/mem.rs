//! In-memory block device.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::cache::BlockData;
use crate::common::{BlockId, Result};

use super::BlockDevice;

/// An in-memory block device.
///
/// Backs blocks with a hash map, so it can serve any (device, block) pair
/// without pre-formatting. A block that has never been written reads as
/// zeros - a fresh disk image.
///
/// Intended for tests and ephemeral caches; everything is lost on drop.
///
/// # Example
/// ```
/// use shardpool::device::{BlockDevice, MemDevice};
/// use shardpool::cache::BlockData;
/// use shardpool::BlockId;
///
/// let dev = MemDevice::new();
/// let mut buf = BlockData::new();
/// buf.as_mut_slice()[0] = 0xAB;
/// dev.write_block(BlockId::new(1, 0), &buf).unwrap();
///
/// let mut out = BlockData::new();
/// dev.read_block(BlockId::new(1, 0), &mut out).unwrap();
/// assert_eq!(out.as_slice()[0], 0xAB);
/// ```
#[derive(Default)]
pub struct MemDevice {
    blocks: Mutex<HashMap<BlockId, Box<BlockData>>>,
}

impl MemDevice {
    /// Create a new empty in-memory device.
    pub fn new() -> Self {
        Self {
            blocks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of blocks that have ever been written.
    pub fn block_count(&self) -> usize {
        self.blocks.lock().len()
    }

    /// Read one byte of a stored block without going through the cache.
    ///
    /// Test helper for verifying write-through; returns `None` if the
    /// block was never written.
    pub fn peek(&self, id: BlockId, offset: usize) -> Option<u8> {
        self.blocks.lock().get(&id).map(|b| b.as_slice()[offset])
    }
}

impl BlockDevice for MemDevice {
    fn read_block(&self, id: BlockId, buf: &mut BlockData) -> Result<()> {
        match self.blocks.lock().get(&id) {
            Some(stored) => buf.as_mut_slice().copy_from_slice(stored.as_slice()),
            None => buf.as_mut_slice().fill(0),
        }
        Ok(())
    }

    fn write_block(&self, id: BlockId, buf: &BlockData) -> Result<()> {
        let mut blocks = self.blocks.lock();
        let stored = blocks.entry(id).or_insert_with(|| Box::new(BlockData::new()));
        stored.as_mut_slice().copy_from_slice(buf.as_slice());
        Ok(())
    }
}
