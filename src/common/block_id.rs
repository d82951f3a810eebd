//! Block identifier type.

use std::fmt;

/// Identifies one block on one device.
///
/// The buffer cache is keyed by this pair: two callers asking for the
/// same `(device, block)` must always be handed the same slot.
///
/// # Example
/// ```
/// use shardpool::BlockId;
///
/// let id = BlockId::new(1, 42);
/// assert_eq!(id.device, 1);
/// assert_eq!(id.block, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    /// Device number.
    pub device: u32,
    /// Block number within the device.
    pub block: u32,
}

impl BlockId {
    /// Create a new BlockId.
    #[inline]
    pub fn new(device: u32, block: u32) -> Self {
        BlockId { device, block }
    }

    /// Bucket index for this key in a table of `buckets` buckets.
    ///
    /// `(device + block) % buckets` — cheap, and with a prime bucket
    /// count it spreads sequential blocks evenly.
    #[inline]
    pub fn bucket(&self, buckets: usize) -> usize {
        (self.device as usize + self.block as usize) % buckets
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.device, self.block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_new() {
        let id = BlockId::new(2, 7);
        assert_eq!(id.device, 2);
        assert_eq!(id.block, 7);
    }

    #[test]
    fn test_block_id_equality() {
        assert_eq!(BlockId::new(1, 5), BlockId::new(1, 5));
        assert_ne!(BlockId::new(1, 5), BlockId::new(1, 6));
        assert_ne!(BlockId::new(1, 5), BlockId::new(2, 5));
    }

    #[test]
    fn test_block_id_bucket() {
        assert_eq!(BlockId::new(1, 1).bucket(2), 0);
        assert_eq!(BlockId::new(1, 2).bucket(2), 1);
        // Same sum, same bucket: the hash only sees device + block.
        assert_eq!(BlockId::new(0, 3).bucket(7), BlockId::new(3, 0).bucket(7));
    }

    #[test]
    fn test_block_id_display() {
        assert_eq!(format!("{}", BlockId::new(1, 42)), "(1, 42)");
    }
}
