//! RAII guard for slot access.
//!
//! A [`SlotGuard`] is the only way to touch cached block content: it
//! holds the slot's blocking content lock for its whole lifetime, so the
//! "must be called with the content lock held" contracts on device read
//! and write-through are enforced by the type system instead of runtime
//! checks. Dropping the guard releases the slot (content lock first, then
//! the reference count, stamping the release tick when it reaches zero).

use std::ops::{Deref, DerefMut};
use std::sync::atomic::Ordering;

use parking_lot::MutexGuard;

use crate::common::{BlockId, Result};
use crate::device::BlockDevice;

use super::data::BlockData;
use super::slot::SlotId;
use super::table::BufferCache;

/// Exclusive access to one cached block.
///
/// At most one guard exists per slot at a time; other acquirers of the
/// same block sleep on the content lock until this guard drops.
///
/// # Example
/// ```ignore
/// let mut guard = cache.read(BlockId::new(1, 7))?;   // loaded from device
/// guard.as_mut_slice()[0] = 0xAB;
/// guard.write()?;                                    // written through
/// // guard drops here: content lock released, reference dropped
/// ```
pub struct SlotGuard<'a, D: BlockDevice> {
    /// Back-reference for release bookkeeping on drop.
    cache: &'a BufferCache<D>,
    /// Arena slot this guard holds.
    slot: SlotId,
    /// Block identity, fixed for the guard's lifetime (refs > 0 pins it).
    id: BlockId,
    /// The content lock. `Option` so Drop can release it *before* the
    /// reference-count bookkeeping, mirroring the release protocol.
    content: Option<MutexGuard<'a, BlockData>>,
}

impl<'a, D: BlockDevice> SlotGuard<'a, D> {
    /// Create a new guard. Called by `BufferCache::acquire`.
    pub(super) fn new(
        cache: &'a BufferCache<D>,
        slot: SlotId,
        id: BlockId,
        content: MutexGuard<'a, BlockData>,
    ) -> Self {
        Self {
            cache,
            slot,
            id,
            content: Some(content),
        }
    }

    /// The block identity this guard caches.
    #[inline]
    pub fn block_id(&self) -> BlockId {
        self.id
    }

    /// The arena slot backing this guard.
    #[inline]
    pub fn slot_id(&self) -> SlotId {
        self.slot
    }

    /// Whether the content currently mirrors the device.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.cache.slot(self.slot).is_valid()
    }

    /// Fetch the block from the device if the content is not yet valid.
    ///
    /// A no-op on a valid slot. `BufferCache::read` calls this for you;
    /// it is public for callers that acquire first and decide later.
    ///
    /// # Errors
    /// Propagates device errors; the slot stays invalid on failure.
    pub fn load(&mut self) -> Result<()> {
        let slot = self.cache.slot(self.slot);
        if !slot.is_valid() {
            let buf = self.content.as_mut().expect("guard content taken");
            self.cache.device().read_block(self.id, buf)?;
            slot.set_valid(true);
            self.cache
                .stats()
                .device_reads
                .fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Write the block content through to the device.
    ///
    /// Holding this guard *is* the content lock, so this cannot be called
    /// on an unlocked slot.
    ///
    /// # Errors
    /// Propagates device errors.
    pub fn write(&self) -> Result<()> {
        let buf = self.content.as_ref().expect("guard content taken");
        self.cache.device().write_block(self.id, buf)?;
        self.cache
            .stats()
            .device_writes
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Access the block content as a byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.content.as_ref().expect("guard content taken").as_slice()
    }

    /// Access the block content as a mutable byte slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.content
            .as_mut()
            .expect("guard content taken")
            .as_mut_slice()
    }
}

impl<D: BlockDevice> Deref for SlotGuard<'_, D> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<D: BlockDevice> DerefMut for SlotGuard<'_, D> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl<D: BlockDevice> Drop for SlotGuard<'_, D> {
    fn drop(&mut self) {
        // Release order matters: content lock first, so a waiter woken by
        // it never observes our reference still counted as "in use" while
        // we also hold the bucket lock.
        self.content.take();
        self.cache.release_slot(self.slot, self.id);
    }
}

/// Proof of one extra reference on a slot, minted by `BufferCache::pin`.
///
/// Keeps the slot resident (never an eviction victim) without holding
/// its content lock. Redeem it with `BufferCache::unpin`; the token is
/// consumed, so a double-unpin does not compile. Discarding a token
/// leaks a reference and pins the slot forever.
#[must_use = "dropping a PinToken leaks a reference; redeem it with unpin()"]
pub struct PinToken {
    pub(super) slot: SlotId,
    pub(super) id: BlockId,
}

impl PinToken {
    /// The slot this token keeps resident.
    #[inline]
    pub fn slot_id(&self) -> SlotId {
        self.slot
    }

    /// The block identity that was pinned.
    #[inline]
    pub fn block_id(&self) -> BlockId {
        self.id
    }
}
