//! BlockData - the fundamental block-sized unit of cached content.

use crate::common::config::BLOCK_SIZE;

/// One block of content (1KB, block-aligned).
///
/// This is the unit of transfer between a slot and a block device.
///
/// # Memory Layout
/// - Size: 1024 bytes (BLOCK_SIZE)
/// - Alignment: 1024 bytes, so device implementations can rely on
///   aligned buffers
///
/// # Clone Implementation
/// `BlockData` does NOT implement `Clone` in production code - copying a
/// block should be explicit. A `#[cfg(test)]` Clone is provided for
/// tests.
///
/// # Example
/// ```
/// use shardpool::cache::BlockData;
///
/// let mut block = BlockData::new();
/// block.as_mut_slice()[0] = 0xFF;
/// assert_eq!(block.as_slice()[0], 0xFF);
/// ```
#[repr(align(1024))]
pub struct BlockData {
    data: [u8; BLOCK_SIZE],
}

impl BlockData {
    /// Create a new zeroed block.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; BLOCK_SIZE],
        }
    }

    /// Get immutable slice of block content.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of block content.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the size of a block.
    #[inline]
    pub const fn size() -> usize {
        BLOCK_SIZE
    }
}

impl Default for BlockData {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for BlockData {
    fn clone(&self) -> Self {
        let mut copy = BlockData::new();
        copy.data.copy_from_slice(&self.data);
        copy
    }
}
