//! Frame - one element of the frame pool arena.

use std::fmt;
use std::ops::{Deref, DerefMut};

use parking_lot::MutexGuard;

use crate::common::config::FRAME_SIZE;

use super::pool::FramePool;

/// A page-sized, page-aligned frame of memory.
#[repr(align(4096))]
pub struct FrameData {
    data: [u8; FRAME_SIZE],
}

impl FrameData {
    pub fn new() -> Self {
        Self {
            data: [0; FRAME_SIZE],
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Overwrite every byte with `byte`.
    #[inline]
    pub fn fill(&mut self, byte: u8) {
        self.data.fill(byte);
    }
}

impl Default for FrameData {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of a frame within the pool arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub(crate) usize);

impl FrameId {
    /// Arena index of this frame.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// Exclusive ownership of an allocated frame.
///
/// Holds the frame's lock for the whole allocation, so the holder has
/// sole access to the bytes via `Deref`/`DerefMut`. The frame is off
/// every free list while a `FrameRef` exists; returning it goes through
/// [`FramePool::free`], which consumes the handle, or through `Drop`,
/// which sends it back to the frame's home shard. Either way the frame
/// is scrubbed before it becomes reclaimable, and a second free of the
/// same frame is simply not expressible.
pub struct FrameRef<'a> {
    pool: &'a FramePool,
    frame: FrameId,
    /// Shard the frame returns to on drop. Defaults to the home shard;
    /// `FramePool::free` retargets it to the freeing core's shard.
    pub(super) target: usize,
    data: Option<MutexGuard<'a, FrameData>>,
}

impl<'a> FrameRef<'a> {
    pub(super) fn new(
        pool: &'a FramePool,
        frame: FrameId,
        target: usize,
        data: MutexGuard<'a, FrameData>,
    ) -> Self {
        Self {
            pool,
            frame,
            target,
            data: Some(data),
        }
    }

    /// The arena frame backing this handle.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_ref().unwrap().as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data.as_mut().unwrap().as_mut_slice()
    }
}

impl Deref for FrameRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl DerefMut for FrameRef<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl Drop for FrameRef<'_> {
    fn drop(&mut self) {
        if let Some(mut data) = self.data.take() {
            // Scrub before the frame becomes visible on a free list;
            // dangling readers see the junk pattern, not stale content.
            data.fill(self.pool.freed_fill());
            drop(data);
            self.pool.push_free(self.target, self.frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_data_size_and_alignment() {
        assert_eq!(std::mem::size_of::<FrameData>(), FRAME_SIZE);
        assert_eq!(std::mem::align_of::<FrameData>(), 4096);
    }

    #[test]
    fn test_frame_data_starts_zeroed() {
        let data = FrameData::new();
        assert!(data.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_frame_data_fill() {
        let mut data = FrameData::new();
        data.fill(0x5A);
        assert!(data.as_slice().iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_frame_id_display() {
        assert_eq!(format!("{}", FrameId(7)), "Frame(7)");
        assert_eq!(FrameId(7).index(), 7);
    }
}
