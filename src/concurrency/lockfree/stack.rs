//! Treiber stack over a node pool.
//!
//! `top` is an [`AtomicTaggedPtr`]. Every push and pop bumps the tag, so a
//! popper whose snapshot predates any other update fails its CAS even if the
//! same node is back on top.

use core::fmt;
use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};

use crossbeam_utils::Backoff;

use super::freelist::{Caching, FreelistPolicy, NodePool};
use super::tagged_ptr::AtomicTaggedPtr;
use super::CapacityError;
use crate::concurrency::atomic::Atomic;
use crate::concurrency::CachePadded;
use crate::ordering::MemoryOrder::{Acquire, Relaxed, Release};
use crate::tracing_helpers::debug_log;

struct Node<T> {
    next: Atomic<*mut Node<T>>,
    data: MaybeUninit<T>,
}

/// A lock-free LIFO stack whose nodes come from a [`FreelistPolicy`] pool.
pub struct LockFreeStack<T, P: FreelistPolicy = Caching> {
    top: CachePadded<AtomicTaggedPtr<Node<T>>>,
    pool: P::Pool<Node<T>>,
}

impl<T, P: FreelistPolicy> LockFreeStack<T, P> {
    /// An empty stack with no nodes reserved.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// An empty stack with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        debug_log!(capacity, "stack created");
        Self {
            top: CachePadded::new(AtomicTaggedPtr::null()),
            pool: <P::Pool<Node<T>> as NodePool<Node<T>>>::with_capacity(capacity),
        }
    }

    /// Reserves `additional` nodes. A no-op for static pools.
    pub fn reserve(&self, additional: usize) {
        self.pool.reserve(additional);
    }

    /// Pushes `value`, or hands it back if the pool is exhausted.
    pub fn push(&self, value: T) -> Result<(), CapacityError<T>> {
        let Some(node) = self.pool.allocate() else {
            return Err(CapacityError(value));
        };
        let node = node.as_ptr();
        // SAFETY: nobody reads `data` of a node they have not popped.
        unsafe { ptr::addr_of_mut!((*node).data).write(MaybeUninit::new(value)) };

        let backoff = Backoff::new();
        let mut top = self.top.load(Relaxed);
        loop {
            // SAFETY: the node is ours; stale poppers only read `next`
            // atomically.
            unsafe { (*node).next.store(top.ptr(), Relaxed) };
            let desired = top.with_next_tag(node);
            if self.top.compare_exchange_weak(&mut top, desired, (Release, Relaxed)) {
                return Ok(());
            }
            backoff.spin();
        }
    }

    /// Pops the most recently pushed element.
    pub fn pop(&self) -> Option<T> {
        let backoff = Backoff::new();
        let mut top = self.top.load(Acquire);
        loop {
            let node = top.ptr();
            if node.is_null() {
                return None;
            }
            // SAFETY: pool nodes stay mapped while the stack lives.
            let next = unsafe { (*node).next.load(Relaxed) };
            let desired = top.with_next_tag(next);
            if self.top.compare_exchange_weak(&mut top, desired, (Acquire, Acquire)) {
                // SAFETY: the CAS made the node ours; its value was written
                // before the push that published it.
                let value = unsafe { ptr::addr_of!((*node).data).read().assume_init() };
                // SAFETY: allocated from this pool and unreachable now.
                unsafe { self.pool.deallocate(NonNull::new_unchecked(node)) };
                return Some(value);
            }
            backoff.spin();
        }
    }

    /// Whether the stack held no elements at the moment of the call.
    pub fn is_empty(&self) -> bool {
        self.top.load(Acquire).is_null()
    }

    /// Whether both the pointer CAS and the node pool never block.
    pub fn is_lock_free(&self) -> bool {
        self.top.is_lock_free() && self.pool.is_lock_free()
    }
}

impl<T, P: FreelistPolicy> Default for LockFreeStack<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P: FreelistPolicy> Drop for LockFreeStack<T, P> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

impl<T, P: FreelistPolicy> fmt::Debug for LockFreeStack<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeStack")
            .field("empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

// SAFETY: elements move between threads by value; nodes are only reached
// through atomics.
unsafe impl<T: Send, P: FreelistPolicy> Send for LockFreeStack<T, P> {}
unsafe impl<T: Send, P: FreelistPolicy> Sync for LockFreeStack<T, P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::lockfree::Static;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn lifo_order() {
        let s: LockFreeStack<i32> = LockFreeStack::new();
        assert!(s.is_empty());
        s.push(1).unwrap();
        s.push(2).unwrap();
        s.push(3).unwrap();
        assert_eq!(s.pop(), Some(3));
        assert_eq!(s.pop(), Some(2));
        s.push(4).unwrap();
        assert_eq!(s.pop(), Some(4));
        assert_eq!(s.pop(), Some(1));
        assert_eq!(s.pop(), None);
    }

    #[test]
    fn push_and_pop_advance_the_tag() {
        let s: LockFreeStack<u32> = LockFreeStack::new();
        let empty = s.top.load(Acquire);
        s.push(1).unwrap();
        let pushed = s.top.load(Acquire);
        assert_ne!(pushed.ptr(), empty.ptr());
        assert_eq!(pushed.tag(), empty.tag().wrapping_add(1));
        assert_eq!(s.pop(), Some(1));
        let popped = s.top.load(Acquire);
        assert!(popped.is_null());
        assert_eq!(popped.tag(), pushed.tag().wrapping_add(1));
    }

    #[test]
    fn static_stack_capacity() {
        let s: LockFreeStack<u8, Static> = LockFreeStack::with_capacity(1);
        s.reserve(10);
        s.push(7).unwrap();
        assert_eq!(s.push(8).unwrap_err().into_inner(), 8);
        assert_eq!(s.pop(), Some(7));
        s.push(9).unwrap();
        assert_eq!(s.pop(), Some(9));
    }

    #[test]
    fn drop_releases_remaining_elements() {
        let marker = Arc::new(());
        {
            let s: LockFreeStack<Arc<()>> = LockFreeStack::with_capacity(2);
            for _ in 0..5 {
                s.push(Arc::clone(&marker)).unwrap();
            }
            assert_eq!(Arc::strong_count(&marker), 6);
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn concurrent_push_pop_conserves_elements() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 2_000;
        let s: Arc<LockFreeStack<usize>> = Arc::new(LockFreeStack::with_capacity(64));
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    let mut popped = Vec::new();
                    for i in 0..PER_THREAD {
                        s.push(t * PER_THREAD + i).unwrap();
                        if i % 2 == 1 {
                            popped.extend(s.pop());
                        }
                    }
                    popped
                })
            })
            .collect();
        let mut all: Vec<usize> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        while let Some(v) = s.pop() {
            all.push(v);
        }
        all.sort_unstable();
        assert_eq!(all, (0..THREADS * PER_THREAD).collect::<Vec<_>>());
    }
}
