//! Lock-free pools of fixed-size node storage.
//!
//! Free slots form a Treiber stack whose head is an [`AtomicTaggedPtr`].
//! Every successful push or pop bumps the tag, so a popper that read a stale
//! head and a stale `next` cannot swing the head to a slot somebody else
//! already took.
//!
//! Slots are never released while the pool is alive. A thread that loaded a
//! head which has since been popped, used and pushed again still reads valid
//! memory; it just loses the CAS.
//!
//! The storage handed out is zero-filled on first use and afterwards holds
//! whatever its previous user left in it.

#[cfg(feature = "tracing")]
use core::alloc::Layout;
use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};

use crossbeam_utils::Backoff;

use super::tagged_ptr::{AtomicTaggedPtr, TaggedPtr};
use crate::concurrency::atomic::Atomic;
use crate::concurrency::CachePadded;
use crate::ordering::MemoryOrder;
use crate::tracing_helpers::{debug_log, trace_log};

/// Storage for one `N`. `data` comes first so a pointer to the slot is a
/// pointer to the data.
#[repr(C)]
struct Slot<N> {
    data: MaybeUninit<N>,
    next: Atomic<*mut Slot<N>>,
}

impl<N> Slot<N> {
    fn vacant() -> Self {
        Self {
            data: MaybeUninit::zeroed(),
            next: Atomic::new(ptr::null_mut()),
        }
    }
}

/// The Treiber stack of free slots shared by both pool flavours.
struct SlotList<N> {
    head: CachePadded<AtomicTaggedPtr<Slot<N>>>,
}

impl<N> SlotList<N> {
    fn new() -> Self {
        Self {
            head: CachePadded::new(AtomicTaggedPtr::null()),
        }
    }

    /// # Safety
    /// `slot` must be a live slot owned by the caller.
    unsafe fn push(&self, slot: *mut Slot<N>) {
        self.push_chain(slot, slot);
    }

    /// Pushes the chain `first -> ... -> last` with one CAS. The chain must
    /// already be linked through `next`, except for `last`.
    ///
    /// # Safety
    /// Every slot in the chain must be live and owned by the caller.
    unsafe fn push_chain(&self, first: *mut Slot<N>, last: *mut Slot<N>) {
        let backoff = Backoff::new();
        let mut head = self.head.load(MemoryOrder::Relaxed);
        loop {
            (*last).next.store(head.ptr(), MemoryOrder::Relaxed);
            let desired = head.with_next_tag(first);
            if self
                .head
                .compare_exchange_weak(&mut head, desired, (MemoryOrder::Release, MemoryOrder::Relaxed))
            {
                return;
            }
            backoff.spin();
        }
    }

    fn pop(&self) -> Option<*mut Slot<N>> {
        let backoff = Backoff::new();
        let mut head = self.head.load(MemoryOrder::Acquire);
        loop {
            let slot = head.ptr();
            if slot.is_null() {
                return None;
            }
            // SAFETY: slots outlive the list, so even a stale head points at
            // a live slot. A stale `next` is caught by the tag.
            let next = unsafe { (*slot).next.load(MemoryOrder::Relaxed) };
            let desired = head.with_next_tag(next);
            if self
                .head
                .compare_exchange_weak(&mut head, desired, (MemoryOrder::Acquire, MemoryOrder::Acquire))
            {
                return Some(slot);
            }
            backoff.spin();
        }
    }

    /// Detaches the whole list. Exclusive access makes the walk safe.
    fn take_all(&mut self) -> Vec<*mut Slot<N>> {
        let mut slots = Vec::new();
        let mut cursor = self.head.load(MemoryOrder::Relaxed).ptr();
        while !cursor.is_null() {
            slots.push(cursor);
            // SAFETY: listed slots are live.
            cursor = unsafe { (*cursor).next.load(MemoryOrder::Relaxed) };
        }
        self.head.store(TaggedPtr::null(), MemoryOrder::Relaxed);
        slots
    }

    fn is_lock_free(&self) -> bool {
        self.head.is_lock_free()
    }
}

/// A source of uninitialized storage for container nodes.
pub trait NodePool<N> {
    /// A pool with room for at least `capacity` nodes.
    fn with_capacity(capacity: usize) -> Self
    where
        Self: Sized;

    /// Takes storage for one node, or `None` if the pool is exhausted.
    fn allocate(&self) -> Option<NonNull<N>>;

    /// Returns storage to the pool. Any value in it is not dropped.
    ///
    /// # Safety
    /// `node` must have come from `allocate` on this pool and must not be
    /// returned twice.
    unsafe fn deallocate(&self, node: NonNull<N>);

    /// Whether `allocate` and `deallocate` never block.
    fn is_lock_free(&self) -> bool;

    /// Makes room for `additional` more nodes where the pool can grow.
    fn reserve(&self, additional: usize);
}

/// A pool that falls back to the global allocator when empty.
///
/// Slots obtained from the allocator are kept when deallocated and only
/// freed when the pool drops, so `allocate` never returns `None`.
pub struct CachingFreelist<N> {
    free: SlotList<N>,
    // Every slot ever allocated, for the final release.
    owned: Atomic<usize>,
}

impl<N> CachingFreelist<N> {
    /// An empty pool.
    pub fn new() -> Self {
        Self {
            free: SlotList::new(),
            owned: Atomic::new(0),
        }
    }

    /// Number of slots obtained from the allocator so far.
    pub fn allocated(&self) -> usize {
        self.owned.load(MemoryOrder::Relaxed)
    }

    fn fresh_slot(&self) -> *mut Slot<N> {
        self.owned.fetch_add(1, MemoryOrder::Relaxed);
        Box::into_raw(Box::new(Slot::vacant()))
    }
}

impl<N> Default for CachingFreelist<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> NodePool<N> for CachingFreelist<N> {
    fn with_capacity(capacity: usize) -> Self {
        let pool = Self::new();
        pool.reserve(capacity);
        debug_log!(capacity, "caching freelist created");
        pool
    }

    fn allocate(&self) -> Option<NonNull<N>> {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                trace_log!(total = self.allocated() + 1, "caching freelist growing");
                self.fresh_slot()
            }
        };
        NonNull::new(slot.cast::<N>())
    }

    unsafe fn deallocate(&self, node: NonNull<N>) {
        self.free.push(node.as_ptr().cast::<Slot<N>>());
    }

    fn is_lock_free(&self) -> bool {
        self.free.is_lock_free()
    }

    fn reserve(&self, additional: usize) {
        if additional == 0 {
            return;
        }
        let first = self.fresh_slot();
        let mut last = first;
        for _ in 1..additional {
            let slot = self.fresh_slot();
            // SAFETY: `last` is a fresh slot nobody else can see yet.
            unsafe { (*last).next.store(slot, MemoryOrder::Relaxed) };
            last = slot;
        }
        // SAFETY: the chain is fresh and linked.
        unsafe { self.free.push_chain(first, last) };
        trace_log!(additional, "caching freelist reserved");
    }
}

impl<N> Drop for CachingFreelist<N> {
    fn drop(&mut self) {
        for slot in self.free.take_all() {
            // SAFETY: each slot came from `Box::into_raw` and is listed once.
            drop(unsafe { Box::from_raw(slot) });
        }
    }
}

// SAFETY: the pool only moves storage for `N` between threads.
unsafe impl<N: Send> Send for CachingFreelist<N> {}
unsafe impl<N: Send> Sync for CachingFreelist<N> {}

/// A pool of exactly `capacity` slots, allocated up front in one block.
pub struct StaticFreelist<N> {
    free: SlotList<N>,
    block: NonNull<[Slot<N>]>,
}

impl<N> StaticFreelist<N> {
    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.block.len()
    }
}

impl<N> NodePool<N> for StaticFreelist<N> {
    fn with_capacity(capacity: usize) -> Self {
        let block: Box<[Slot<N>]> = (0..capacity).map(|_| Slot::vacant()).collect();
        let block = NonNull::from(Box::leak(block));
        let free = SlotList::new();
        if capacity > 0 {
            let base = block.as_ptr().cast::<Slot<N>>();
            // SAFETY: all slots are in bounds and nobody else sees them yet.
            unsafe {
                for i in 1..capacity {
                    (*base.add(i - 1)).next.store(base.add(i), MemoryOrder::Relaxed);
                }
                free.push_chain(base, base.add(capacity - 1));
            }
        }
        debug_log!(capacity, slot = Layout::new::<Slot<N>>().size(), "static freelist created");
        Self { free, block }
    }

    fn allocate(&self) -> Option<NonNull<N>> {
        self.free.pop().and_then(|slot| NonNull::new(slot.cast::<N>()))
    }

    unsafe fn deallocate(&self, node: NonNull<N>) {
        self.free.push(node.as_ptr().cast::<Slot<N>>());
    }

    fn is_lock_free(&self) -> bool {
        self.free.is_lock_free()
    }

    fn reserve(&self, _additional: usize) {}
}

impl<N> Drop for StaticFreelist<N> {
    fn drop(&mut self) {
        // SAFETY: `block` came from `Box::leak` and is released once.
        drop(unsafe { Box::from_raw(self.block.as_ptr()) });
    }
}

// SAFETY: as for `CachingFreelist`.
unsafe impl<N: Send> Send for StaticFreelist<N> {}
unsafe impl<N: Send> Sync for StaticFreelist<N> {}

/// Chooses the pool a container allocates its nodes from.
pub trait FreelistPolicy {
    /// The pool type for nodes `N`.
    type Pool<N>: NodePool<N>;
}

/// Grow from the global allocator when the pool runs dry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caching;

/// Fixed capacity; operations fail when the pool runs dry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Static;

impl FreelistPolicy for Caching {
    type Pool<N> = CachingFreelist<N>;
}

impl FreelistPolicy for Static {
    type Pool<N> = StaticFreelist<N>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn static_pool_of_one() {
        let pool = StaticFreelist::<u64>::with_capacity(1);
        let first = pool.allocate().expect("one slot");
        assert!(pool.allocate().is_none());
        unsafe { pool.deallocate(first) };
        let again = pool.allocate().expect("slot returned");
        assert_eq!(again, first);
        unsafe { pool.deallocate(again) };
    }

    #[test]
    fn static_pool_hands_out_distinct_slots() {
        let pool = StaticFreelist::<[u8; 24]>::with_capacity(8);
        assert_eq!(pool.capacity(), 8);
        let nodes: Vec<_> = (0..8).map(|_| pool.allocate().expect("capacity")).collect();
        let unique: HashSet<_> = nodes.iter().map(|p| p.as_ptr() as usize).collect();
        assert_eq!(unique.len(), 8);
        assert!(pool.allocate().is_none());
        for node in nodes {
            unsafe { pool.deallocate(node) };
        }
    }

    #[test]
    fn caching_pool_grows_and_recycles() {
        let pool = CachingFreelist::<String>::with_capacity(2);
        assert_eq!(pool.allocated(), 2);
        let a = pool.allocate().expect("caching");
        let b = pool.allocate().expect("caching");
        let c = pool.allocate().expect("caching");
        assert_eq!(pool.allocated(), 3);
        unsafe {
            c.as_ptr().write(String::from("kept in the slot, never dropped by the pool"));
            core::ptr::drop_in_place(c.as_ptr());
            pool.deallocate(b);
            assert_eq!(pool.allocate(), Some(b));
            pool.deallocate(a);
            pool.deallocate(b);
            pool.deallocate(c);
        }
        pool.reserve(3);
        assert_eq!(pool.allocated(), 6);
        assert_eq!(pool.is_lock_free(), AtomicTaggedPtr::<u8>::null().is_lock_free());
    }

    #[test]
    fn no_double_allocation_under_contention() {
        const THREADS: usize = 4;
        const ROUNDS: usize = 2_000;
        let pool = Arc::new(StaticFreelist::<u64>::with_capacity(THREADS * 2));
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|id| {
                let pool = Arc::clone(&pool);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for round in 0..ROUNDS {
                        let Some(node) = pool.allocate() else { continue };
                        let stamp = (id * ROUNDS + round) as u64;
                        unsafe {
                            node.as_ptr().write(stamp);
                            thread::yield_now();
                            // Nobody else may have been handed this slot meanwhile.
                            assert_eq!(node.as_ptr().read(), stamp);
                            pool.deallocate(node);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let all: Vec<_> = (0..THREADS * 2).map(|_| pool.allocate().expect("all returned")).collect();
        assert!(pool.allocate().is_none());
        for node in all {
            unsafe { pool.deallocate(node) };
        }
    }
}
