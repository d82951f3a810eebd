//! FramePool - the per-core sharded frame allocator.
//!
//! The [`FramePool`] provides:
//! - A fixed arena of page frames split into per-core free-list shards
//! - Lock-per-shard allocation: cores touch only their own list until
//!   it runs dry
//! - Work stealing: an empty shard takes the larger half of the first
//!   non-empty neighbor's list
//!
//! # Architecture
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        FramePool                           │
//! │  ┌──────────────────────┐  ┌───────────────────────────┐  │
//! │  │ shards: Vec<Mutex>   │  │   frames: Vec<FrameCell>  │  │
//! │  │ [s0] [s1] ... [sC]   │─▶│ [F0] [F1] [F2] ... [FN]   │  │
//! │  │  free-list heads     │  │ (linked via `next` links) │  │
//! │  └──────────────────────┘  └───────────────────────────┘  │
//! │  ┌──────────────────────┐  ┌────────────┐                │
//! │  │ fresh: AtomicUsize   │  │ stats      │                │
//! │  │ (populate cursor)    │  │ (atomics)  │                │
//! │  └──────────────────────┘  └────────────┘                │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! At most one shard lock is ever held at a time: the steal path drops
//! the empty local lock, detaches the donor's half under the donor lock
//! alone, and only then reacquires the local lock to splice the surplus
//! in. No lock ordering, no pool-wide lock, no deadlock.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::common::config::{FILL_ALLOCATED, FILL_FREED};
use crate::common::CoreId;

use super::frame::{FrameData, FrameId, FrameRef};
use super::stats::PoolStats;

/// Sentinel for "no next frame" in a free list.
const NIL: usize = usize::MAX;

/// One arena frame: its bytes plus the free-list link.
///
/// The `data` lock is held for the whole lifetime of an allocation (by
/// the [`FrameRef`]), so a frame sitting on a free list is always
/// unlocked. The `next` link is only mutated under the lock of the
/// shard that currently owns the frame, or while the frame is privately
/// held by a thief between detach and splice.
struct FrameCell {
    data: Mutex<FrameData>,
    next: AtomicUsize,
}

/// Head of one shard's free list.
struct FreeList {
    head: usize,
    len: usize,
}

/// A fixed arena of page frames sharded into per-core free lists.
///
/// Frames enter the pool through [`FramePool::populate`] and then cycle
/// between free lists and [`FrameRef`] holders forever; the arena never
/// grows or shrinks. Freed frames are scrubbed with a junk pattern and
/// allocated frames with another, so use-after-free and uninitialized
/// reads show up as recognizable garbage instead of stale data.
///
/// # Usage
/// ```
/// use shardpool::alloc::FramePool;
/// use shardpool::CoreId;
///
/// let pool = FramePool::new(16, 4);
/// pool.populate(CoreId::new(0), 16);
///
/// let mut frame = pool.allocate(CoreId::new(0)).unwrap();
/// frame[0] = 0xAB;
/// pool.free(CoreId::new(0), frame);
/// ```
pub struct FramePool {
    /// Fixed frame arena; free-list links index into this.
    frames: Vec<FrameCell>,

    /// One short-hold lock + list head per core shard.
    shards: Vec<Mutex<FreeList>>,

    /// Next never-populated frame index.
    fresh: AtomicUsize,

    /// Junk byte written over freed frames.
    fill_freed: u8,

    /// Junk byte written over frames handed to allocators.
    fill_allocated: u8,

    /// Performance counters.
    stats: PoolStats,
}

impl FramePool {
    /// Create a pool with `frames` frames and `shards` free-list shards.
    ///
    /// All free lists start empty; hand frames out with
    /// [`FramePool::populate`].
    ///
    /// # Panics
    /// Panics if `frames` or `shards` is 0.
    pub fn new(frames: usize, shards: usize) -> Self {
        Self::with_fill_patterns(frames, shards, FILL_FREED, FILL_ALLOCATED)
    }

    /// Create a pool with caller-chosen junk bytes for freed and
    /// allocated frames.
    ///
    /// Distinct patterns make use-after-free and missing initialization
    /// show up as recognizable garbage.
    ///
    /// # Panics
    /// Panics if `frames` or `shards` is 0.
    pub fn with_fill_patterns(
        frames: usize,
        shards: usize,
        fill_freed: u8,
        fill_allocated: u8,
    ) -> Self {
        assert!(frames > 0, "frame count must be > 0");
        assert!(shards > 0, "shard count must be > 0");

        Self {
            frames: (0..frames)
                .map(|_| FrameCell {
                    data: Mutex::new(FrameData::new()),
                    next: AtomicUsize::new(NIL),
                })
                .collect(),
            shards: (0..shards)
                .map(|_| Mutex::new(FreeList { head: NIL, len: 0 }))
                .collect(),
            fresh: AtomicUsize::new(0),
            fill_freed,
            fill_allocated,
            stats: PoolStats::new(),
        }
    }

    // ========================================================================
    // Public API: allocation
    // ========================================================================

    /// Move up to `count` never-populated frames onto `core`'s free
    /// list, scrubbed with the freed-junk pattern.
    ///
    /// Returns the number actually populated (less than `count` once the
    /// arena runs out; zero thereafter).
    pub fn populate(&self, core: CoreId, count: usize) -> usize {
        let total = self.frames.len();
        let start = match self.fresh.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
            if cur >= total {
                None
            } else {
                Some((cur + count).min(total))
            }
        }) {
            Ok(prev) => prev,
            Err(_) => return 0,
        };
        let end = (start + count).min(total);

        // The claimed range is private until pushed, so the scrub needs
        // no shard lock.
        for frame in start..end {
            self.frames[frame].data.lock().fill(self.fill_freed);
        }

        let mut list = self.shards[self.shard_of(core)].lock();
        for frame in start..end {
            self.frames[frame].next.store(list.head, Ordering::Relaxed);
            list.head = frame;
            list.len += 1;
        }
        end - start
    }

    /// Allocate a frame for `core`, stealing from another shard if the
    /// local list is empty.
    ///
    /// Returns `None` when every shard is empty. That is ordinary
    /// exhaustion, not an error: frames come back as holders free them.
    pub fn allocate(&self, core: CoreId) -> Option<FrameRef<'_>> {
        let local = self.shard_of(core);

        // Local fast path.
        let popped = {
            let mut list = self.shards[local].lock();
            self.pop(&mut list)
        };
        if let Some(frame) = popped {
            return Some(self.seize(frame));
        }

        // Steal round: probe the other shards starting at our neighbor.
        for step in 1..self.shards.len() {
            let donor = (local + step) % self.shards.len();
            let Some((head, count)) = self.detach_half(donor) else {
                continue;
            };

            self.stats.steals.fetch_add(1, Ordering::Relaxed);
            self.stats
                .frames_stolen
                .fetch_add(count as u64, Ordering::Relaxed);

            // The first stolen frame satisfies this allocation; the
            // surplus is spliced onto the local list, on top of anything
            // freed there since we gave up its lock.
            let rest = self.next_of(head);
            if rest != NIL {
                self.splice(local, rest, count - 1);
            }
            return Some(self.seize(head));
        }

        self.stats.exhausted.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Return a frame to `core`'s free list.
    ///
    /// Consuming the handle is the whole double-free story: without a
    /// `FrameRef` there is nothing to free with.
    pub fn free(&self, core: CoreId, mut frame: FrameRef<'_>) {
        frame.target = self.shard_of(core);
        // The handle's drop scrubs the frame and pushes it.
    }

    // ========================================================================
    // Public API: introspection
    // ========================================================================

    /// Get pool statistics.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Number of frames in the arena.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of free-list shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Free frames on one shard's list.
    pub fn shard_free_count(&self, shard: usize) -> usize {
        self.shards[shard].lock().len
    }

    /// Free frames across all shards.
    ///
    /// Locks each shard in turn; the total is exact only while the pool
    /// is otherwise quiescent.
    pub fn free_count(&self) -> usize {
        (0..self.shards.len())
            .map(|shard| self.shard_free_count(shard))
            .sum()
    }

    // ========================================================================
    // Internal: free-list plumbing
    // ========================================================================

    #[inline]
    fn shard_of(&self, core: CoreId) -> usize {
        core.0 % self.shards.len()
    }

    #[inline]
    fn next_of(&self, frame: usize) -> usize {
        self.frames[frame].next.load(Ordering::Relaxed)
    }

    /// Pop the head frame. Caller holds the shard lock.
    fn pop(&self, list: &mut FreeList) -> Option<usize> {
        if list.head == NIL {
            return None;
        }
        let frame = list.head;
        list.head = self.next_of(frame);
        list.len -= 1;
        Some(frame)
    }

    /// Detach the larger half of `donor`'s free list.
    ///
    /// Two runners walk the list: `fast` two links per step, the split
    /// point one, with `pre` trailing the split point. The donor keeps
    /// `[head ..= pre]`; the detached segment `[split ..]` gets the
    /// extra frame on odd lengths. Returns the segment head and length,
    /// or `None` if the donor is empty too.
    fn detach_half(&self, donor: usize) -> Option<(usize, usize)> {
        let mut list = self.shards[donor].lock();
        if list.head == NIL {
            return None;
        }

        let mut pre = NIL;
        let mut split = list.head;
        let mut fast = list.head;
        loop {
            let n1 = self.next_of(fast);
            if n1 == NIL {
                break;
            }
            pre = split;
            split = self.next_of(split);
            fast = self.next_of(n1);
            if fast == NIL {
                break;
            }
        }

        let mut count = 0;
        let mut cur = split;
        while cur != NIL {
            count += 1;
            cur = self.next_of(cur);
        }

        if pre == NIL {
            list.head = NIL;
        } else {
            self.frames[pre].next.store(NIL, Ordering::Relaxed);
        }
        list.len -= count;

        Some((split, count))
    }

    /// Splice a privately-held segment onto a shard's list head.
    fn splice(&self, shard: usize, head: usize, count: usize) {
        let mut tail = head;
        loop {
            let next = self.next_of(tail);
            if next == NIL {
                break;
            }
            tail = next;
        }

        let mut list = self.shards[shard].lock();
        self.frames[tail].next.store(list.head, Ordering::Relaxed);
        list.head = head;
        list.len += count;
    }

    /// Claim a frame popped off a free list and hand it out.
    ///
    /// The frame's lock must be free here: a locked frame on a free
    /// list means the bookkeeping was corrupted, which is fatal. The
    /// handle's drop target defaults to the frame's home shard (index
    /// mod shard count); an explicit `free` retargets it.
    fn seize(&self, frame: usize) -> FrameRef<'_> {
        let cell = &self.frames[frame];
        cell.next.store(NIL, Ordering::Relaxed);

        let mut data = cell
            .data
            .try_lock()
            .unwrap_or_else(|| panic!("frame {frame} is on a free list while in use"));
        data.fill(self.fill_allocated);

        self.stats.allocated.fetch_add(1, Ordering::Relaxed);
        FrameRef::new(self, FrameId(frame), frame % self.shards.len(), data)
    }

    /// Junk byte freed frames are scrubbed with.
    #[inline]
    pub(super) fn freed_fill(&self) -> u8 {
        self.fill_freed
    }

    /// Push a frame onto a shard's list. Called by `FrameRef` on drop,
    /// after the frame has been scrubbed and its lock released.
    pub(super) fn push_free(&self, shard: usize, frame: FrameId) {
        let mut list = self.shards[shard].lock();
        self.frames[frame.0].next.store(list.head, Ordering::Relaxed);
        list.head = frame.0;
        list.len += 1;
        self.stats.freed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pool_is_empty() {
        let pool = FramePool::new(8, 2);
        assert_eq!(pool.frame_count(), 8);
        assert_eq!(pool.shard_count(), 2);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn test_populate() {
        let pool = FramePool::new(8, 2);
        assert_eq!(pool.populate(CoreId::new(0), 5), 5);
        assert_eq!(pool.shard_free_count(0), 5);

        // Only three fresh frames left.
        assert_eq!(pool.populate(CoreId::new(1), 5), 3);
        assert_eq!(pool.shard_free_count(1), 3);
        assert_eq!(pool.populate(CoreId::new(0), 1), 0);
    }

    #[test]
    fn test_allocate_scrubs_with_junk() {
        let pool = FramePool::new(4, 1);
        pool.populate(CoreId::new(0), 4);

        let frame = pool.allocate(CoreId::new(0)).unwrap();
        assert!(frame.iter().all(|&b| b == FILL_ALLOCATED));
    }

    #[test]
    fn test_custom_fill_patterns() {
        let pool = FramePool::with_fill_patterns(2, 1, 0xAA, 0xBB);
        pool.populate(CoreId::new(0), 2);

        let mut frame = pool.allocate(CoreId::new(0)).unwrap();
        assert!(frame.iter().all(|&b| b == 0xBB));
        frame[0] = 0x11;
        pool.free(CoreId::new(0), frame);

        // A recycled frame carries the allocation byte again, never its
        // previous contents.
        let frame = pool.allocate(CoreId::new(0)).unwrap();
        assert!(frame.iter().all(|&b| b == 0xBB));
        drop(frame);
    }

    #[test]
    fn test_allocate_free_cycle() {
        let pool = FramePool::new(2, 1);
        pool.populate(CoreId::new(0), 2);

        let frame = pool.allocate(CoreId::new(0)).unwrap();
        assert_eq!(pool.free_count(), 1);
        pool.free(CoreId::new(0), frame);
        assert_eq!(pool.free_count(), 2);

        let snapshot = pool.stats().snapshot();
        assert_eq!(snapshot.allocated, 1);
        assert_eq!(snapshot.freed, 1);
        assert_eq!(snapshot.in_use(), 0);
    }

    #[test]
    fn test_exhaustion_is_none() {
        let pool = FramePool::new(1, 1);
        pool.populate(CoreId::new(0), 1);

        let held = pool.allocate(CoreId::new(0)).unwrap();
        assert!(pool.allocate(CoreId::new(0)).is_none());
        assert_eq!(pool.stats().snapshot().exhausted, 1);

        pool.free(CoreId::new(0), held);
        assert!(pool.allocate(CoreId::new(0)).is_some());
    }

    #[test]
    fn test_steal_takes_larger_half() {
        let pool = FramePool::new(5, 2);
        pool.populate(CoreId::new(1), 5);
        assert_eq!(pool.shard_free_count(1), 5);

        // Core 0's shard is empty: the allocation steals three of the
        // five, keeps one, and leaves two on the local list.
        let frame = pool.allocate(CoreId::new(0)).unwrap();
        assert_eq!(pool.shard_free_count(1), 2);
        assert_eq!(pool.shard_free_count(0), 2);

        let snapshot = pool.stats().snapshot();
        assert_eq!(snapshot.steals, 1);
        assert_eq!(snapshot.frames_stolen, 3);

        pool.free(CoreId::new(0), frame);
        assert_eq!(pool.shard_free_count(0), 3);
    }

    #[test]
    fn test_steal_single_frame_donor() {
        let pool = FramePool::new(1, 2);
        pool.populate(CoreId::new(1), 1);

        // A one-frame donor gives up its whole list.
        let frame = pool.allocate(CoreId::new(0)).unwrap();
        assert_eq!(pool.shard_free_count(1), 0);
        assert_eq!(pool.shard_free_count(0), 0);
        assert_eq!(pool.stats().snapshot().frames_stolen, 1);
        drop(frame);
    }

    #[test]
    fn test_steal_probes_past_empty_shards() {
        let pool = FramePool::new(4, 4);
        pool.populate(CoreId::new(3), 4);

        // Shards 1 and 2 are empty; the probe must reach shard 3.
        assert!(pool.allocate(CoreId::new(0)).is_some());
        assert_eq!(pool.stats().snapshot().steals, 1);
    }

    #[test]
    fn test_drop_returns_frame() {
        let pool = FramePool::new(2, 2);
        pool.populate(CoreId::new(0), 2);

        let frame = pool.allocate(CoreId::new(0)).unwrap();
        drop(frame);
        assert_eq!(pool.free_count(), 2);
        assert_eq!(pool.stats().snapshot().in_use(), 0);
    }

    #[test]
    fn test_frame_conservation() {
        let pool = FramePool::new(8, 2);
        pool.populate(CoreId::new(0), 4);
        pool.populate(CoreId::new(1), 4);

        let a = pool.allocate(CoreId::new(0)).unwrap();
        let b = pool.allocate(CoreId::new(1)).unwrap();
        let c = pool.allocate(CoreId::new(0)).unwrap();
        assert_eq!(pool.free_count(), 5);

        // Free on a different core than the allocation.
        pool.free(CoreId::new(1), a);
        pool.free(CoreId::new(0), b);
        pool.free(CoreId::new(0), c);
        assert_eq!(pool.free_count(), 8);
    }

    #[test]
    fn test_concurrent_churn() {
        use std::sync::Arc;
        use std::thread;

        let pool = Arc::new(FramePool::new(32, 4));
        for shard in 0..4 {
            pool.populate(CoreId::new(shard), 8);
        }

        let mut handles = vec![];
        for t in 0..4 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                let core = CoreId::new(t);
                for _ in 0..200 {
                    if let Some(mut frame) = pool.allocate(core) {
                        frame[0] = t as u8;
                        pool.free(core, frame);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Every frame came home.
        assert_eq!(pool.free_count(), 32);
        assert_eq!(pool.stats().snapshot().in_use(), 0);
    }
}
