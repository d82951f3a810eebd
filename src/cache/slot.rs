//! Slot - one element of the buffer cache arena.
//!
//! A [`Slot`] holds one block's content plus the metadata the cache
//! needs: identity, validity, reference count, last-release tick, and the
//! chain link tying it into its current bucket.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::common::BlockId;

use super::data::BlockData;

/// Sentinel for "no next slot" in a bucket chain.
pub(crate) const NIL: usize = usize::MAX;

/// Index of a slot within the cache arena.
///
/// The arena is fixed at construction; a `SlotId` is valid for the
/// lifetime of the cache and identifies the same storage even as the
/// slot is recycled under new block identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    #[inline]
    pub(crate) fn new(id: usize) -> Self {
        SlotId(id)
    }

    /// Arena index of this slot.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

/// A slot in the buffer cache.
///
/// # Locking Model
/// Two locks with very different hold profiles:
/// - `content` is the *blocking* content lock: held for the whole time a
///   caller uses the block, including across device I/O. The only
///   suspension point in the cache.
/// - The metadata fields (`key`, `valid`, `refs`, `stamp`, `next`) are
///   only mutated while holding the short-hold lock of the bucket that
///   currently owns the slot. They are atomics (and a short `Mutex` for
///   the key) so cross-thread reads are race-free; the *ordering* comes
///   from the bucket lock, not from the atomics.
pub(crate) struct Slot {
    /// The block content, guarded by the blocking content lock.
    content: Mutex<BlockData>,

    /// Which (device, block) this slot caches, or None if never used.
    key: Mutex<Option<BlockId>>,

    /// Whether `content` holds the device's bytes for `key`.
    valid: AtomicBool,

    /// Number of active references (guards + pins).
    refs: AtomicU32,

    /// Tick of the last release (or last touch); smallest wins eviction.
    stamp: AtomicU64,

    /// Next slot in the owning bucket's chain (NIL terminates).
    next: AtomicUsize,
}

impl Slot {
    /// Create an empty slot, unchained and unreferenced.
    pub(crate) fn new(stamp: u64) -> Self {
        Self {
            content: Mutex::new(BlockData::new()),
            key: Mutex::new(None),
            valid: AtomicBool::new(false),
            refs: AtomicU32::new(0),
            stamp: AtomicU64::new(stamp),
            next: AtomicUsize::new(NIL),
        }
    }

    /// Block the calling thread until the content lock is available.
    #[inline]
    pub(crate) fn lock_content(&self) -> MutexGuard<'_, BlockData> {
        self.content.lock()
    }

    // ========================================================================
    // Identity
    // ========================================================================

    #[inline]
    pub(crate) fn key(&self) -> Option<BlockId> {
        *self.key.lock()
    }

    /// Rebind the slot to a new key. Caller holds the owning bucket lock.
    #[inline]
    pub(crate) fn set_key(&self, key: Option<BlockId>) {
        *self.key.lock() = key;
    }

    // ========================================================================
    // Validity
    // ========================================================================

    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::Release);
    }

    // ========================================================================
    // Reference count
    // ========================================================================

    #[inline]
    pub(crate) fn refs(&self) -> u32 {
        self.refs.load(Ordering::Relaxed)
    }

    /// Increment the reference count. Returns the new count.
    #[inline]
    pub(crate) fn ref_incr(&self) -> u32 {
        self.refs.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the reference count. Returns the new count.
    ///
    /// # Panics
    /// Panics if the count is already 0 - a release without a matching
    /// acquire is a caller contract violation.
    #[inline]
    pub(crate) fn ref_decr(&self) -> u32 {
        let old = self.refs.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "slot reference count underflow");
        old - 1
    }

    /// Seize the slot for a new identity (eviction). Caller holds the
    /// owning bucket lock and has observed `refs() == 0`.
    #[inline]
    pub(crate) fn ref_seize(&self) {
        self.refs.store(1, Ordering::Relaxed);
    }

    // ========================================================================
    // Eviction stamp and chain link
    // ========================================================================

    #[inline]
    pub(crate) fn stamp(&self) -> u64 {
        self.stamp.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_stamp(&self, tick: u64) {
        self.stamp.store(tick, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn next(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }

    /// Relink the slot. Caller holds the owning bucket lock.
    #[inline]
    pub(crate) fn set_next(&self, next: usize) {
        self.next.store(next, Ordering::Relaxed);
    }
}
