//! Michael & Scott multi-producer multi-consumer queue.
//!
//! The queue always holds one dummy node; `head` points at it and the first
//! element lives in `head.next`. Enqueuers link at `tail.next` and then try
//! to swing `tail`; any thread that sees `tail` lagging helps it forward.
//! Both ends and every `next` link are [`AtomicTaggedPtr`]s.

use core::alloc::Layout;
use core::cell::UnsafeCell;
use core::fmt;
use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};

use crossbeam_utils::Backoff;

use super::freelist::{Caching, FreelistPolicy, NodePool};
use super::tagged_ptr::{AtomicTaggedPtr, TaggedPtr};
use super::CapacityError;
use crate::concurrency::CachePadded;
use crate::ordering::MemoryOrder::{AcqRel, Acquire, Relaxed, Release};
use crate::tracing_helpers::debug_log;

struct Node<T> {
    next: AtomicTaggedPtr<Node<T>>,
    data: UnsafeCell<MaybeUninit<T>>,
}

/// Nodes needed to hold `capacity` elements: one more for the dummy.
fn nodes_for(capacity: usize) -> usize {
    capacity.saturating_add(1)
}

/// A lock-free FIFO queue whose nodes come from a [`FreelistPolicy`] pool.
///
/// With [`Caching`] (the default) `enqueue` only fails if the allocator
/// does; with [`Static`](super::Static) the queue holds at most the
/// capacity it was created with.
///
/// ```
/// use halo_atomic::LockFreeQueue;
///
/// let q: LockFreeQueue<i32> = LockFreeQueue::new();
/// q.enqueue(1).unwrap();
/// q.enqueue(2).unwrap();
/// assert_eq!(q.dequeue(), Some(1));
/// assert_eq!(q.dequeue(), Some(2));
/// assert_eq!(q.dequeue(), None);
/// ```
pub struct LockFreeQueue<T, P: FreelistPolicy = Caching> {
    head: CachePadded<AtomicTaggedPtr<Node<T>>>,
    tail: CachePadded<AtomicTaggedPtr<Node<T>>>,
    pool: P::Pool<Node<T>>,
}

impl<T, P: FreelistPolicy> LockFreeQueue<T, P> {
    /// An empty queue with no nodes reserved.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// An empty queue with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        let pool = <P::Pool<Node<T>> as NodePool<Node<T>>>::with_capacity(nodes_for(capacity));
        let Some(dummy) = pool.allocate() else {
            std::alloc::handle_alloc_error(Layout::new::<Node<T>>());
        };
        let dummy = dummy.as_ptr();
        // SAFETY: freshly allocated and not yet shared.
        unsafe {
            let link = (*dummy).next.load(Relaxed);
            (*dummy).next.store(link.with_next_tag(ptr::null_mut()), Relaxed);
        }
        debug_log!(capacity, "queue created");
        Self {
            head: CachePadded::new(AtomicTaggedPtr::new(TaggedPtr::new(dummy, 0))),
            tail: CachePadded::new(AtomicTaggedPtr::new(TaggedPtr::new(dummy, 0))),
            pool,
        }
    }

    /// Appends `value`, or hands it back if the pool is exhausted.
    pub fn enqueue(&self, value: T) -> Result<(), CapacityError<T>> {
        let Some(node) = self.pool.allocate() else {
            return Err(CapacityError(value));
        };
        let node = node.as_ptr();
        // SAFETY: the node is ours until the linking CAS publishes it. Stale
        // readers only touch `next`, which is atomic.
        unsafe {
            (*(*node).data.get()).write(value);
            let link = (*node).next.load(Relaxed);
            (*node).next.store(link.with_next_tag(ptr::null_mut()), Relaxed);
        }

        let backoff = Backoff::new();
        loop {
            let tail = self.tail.load(Acquire);
            // SAFETY: nodes outlive the queue's pool, so `tail.ptr()` is
            // readable even if it has been recycled.
            let next = unsafe { (*tail.ptr()).next.load(Acquire) };
            if tail != self.tail.load(Acquire) {
                backoff.spin();
                continue;
            }
            if next.is_null() {
                let mut expected = next;
                // SAFETY: as above.
                let linked = unsafe {
                    (*tail.ptr())
                        .next
                        .compare_exchange_weak(&mut expected, next.with_next_tag(node), (Release, Relaxed))
                };
                if linked {
                    let mut expected = tail;
                    self.tail
                        .compare_exchange_strong(&mut expected, tail.with_next_tag(node), (Release, Relaxed));
                    return Ok(());
                }
            } else {
                // Tail is lagging; help it along.
                let mut expected = tail;
                self.tail
                    .compare_exchange_strong(&mut expected, tail.with_next_tag(next.ptr()), (Release, Relaxed));
            }
            backoff.spin();
        }
    }

    /// Removes the oldest element.
    pub fn dequeue(&self) -> Option<T> {
        let backoff = Backoff::new();
        loop {
            let head = self.head.load(Acquire);
            let tail = self.tail.load(Acquire);
            // SAFETY: `head.ptr()` is never null and never freed while the
            // queue lives.
            let next = unsafe { (*head.ptr()).next.load(Acquire) };
            if head != self.head.load(Acquire) {
                backoff.spin();
                continue;
            }
            if head.ptr() == tail.ptr() {
                if next.is_null() {
                    return None;
                }
                let mut expected = tail;
                self.tail
                    .compare_exchange_strong(&mut expected, tail.with_next_tag(next.ptr()), (Release, Relaxed));
            } else if !next.is_null() {
                // Copy before the CAS: once head moves, another dequeuer may
                // recycle `next`. A losing copy is discarded unread.
                // SAFETY: pool memory stays mapped; the bytes are only
                // assumed initialized after the CAS proves them ours.
                let data = unsafe { ptr::read((*next.ptr()).data.get()) };
                let mut expected = head;
                if self
                    .head
                    .compare_exchange_weak(&mut expected, head.with_next_tag(next.ptr()), (AcqRel, Relaxed))
                {
                    // SAFETY: the old dummy is unreachable from the queue now.
                    unsafe { self.pool.deallocate(NonNull::new_unchecked(head.ptr())) };
                    // SAFETY: the winning CAS saw `next` linked after its
                    // value was written.
                    return Some(unsafe { data.assume_init() });
                }
            }
            backoff.spin();
        }
    }

    /// Whether the queue held no elements at the moment of the call.
    pub fn is_empty(&self) -> bool {
        let head = self.head.load(Acquire);
        // SAFETY: see `dequeue`.
        unsafe { (*head.ptr()).next.load(Acquire).is_null() }
    }

    /// Whether both the pointer CAS and the node pool never block.
    pub fn is_lock_free(&self) -> bool {
        self.head.is_lock_free() && self.pool.is_lock_free()
    }
}

impl<T, P: FreelistPolicy> Default for LockFreeQueue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P: FreelistPolicy> Drop for LockFreeQueue<T, P> {
    fn drop(&mut self) {
        while self.dequeue().is_some() {}
        let dummy = self.head.load(Relaxed).ptr();
        if let Some(dummy) = NonNull::new(dummy) {
            // SAFETY: the dummy is the last node the queue owns.
            unsafe { self.pool.deallocate(dummy) };
        }
    }
}

impl<T, P: FreelistPolicy> fmt::Debug for LockFreeQueue<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeQueue")
            .field("empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

// SAFETY: elements move between threads by value; nodes are only reached
// through atomics.
unsafe impl<T: Send, P: FreelistPolicy> Send for LockFreeQueue<T, P> {}
unsafe impl<T: Send, P: FreelistPolicy> Sync for LockFreeQueue<T, P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::lockfree::Static;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_single_thread() {
        let q: LockFreeQueue<u32> = LockFreeQueue::new();
        assert!(q.is_empty());
        for i in 0..10 {
            q.enqueue(i).unwrap();
        }
        assert!(!q.is_empty());
        for i in 0..10 {
            assert_eq!(q.dequeue(), Some(i));
        }
        assert_eq!(q.dequeue(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn node_count_includes_dummy_without_overflow() {
        assert_eq!(nodes_for(0), 1);
        assert_eq!(nodes_for(7), 8);
        assert_eq!(nodes_for(usize::MAX), usize::MAX);
    }

    #[test]
    fn static_queue_rejects_when_full() {
        let q: LockFreeQueue<String, Static> = LockFreeQueue::with_capacity(2);
        q.enqueue("a".into()).unwrap();
        q.enqueue("b".into()).unwrap();
        let err = q.enqueue("c".into()).unwrap_err();
        assert_eq!(err.into_inner(), "c");
        assert_eq!(q.dequeue().as_deref(), Some("a"));
        q.enqueue("d".into()).unwrap();
        assert_eq!(q.dequeue().as_deref(), Some("b"));
        assert_eq!(q.dequeue().as_deref(), Some("d"));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn drop_releases_remaining_elements() {
        let marker = Arc::new(());
        {
            let q: LockFreeQueue<Arc<()>> = LockFreeQueue::with_capacity(4);
            for _ in 0..6 {
                q.enqueue(Arc::clone(&marker)).unwrap();
            }
            q.dequeue();
            assert_eq!(Arc::strong_count(&marker), 6);
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn concurrent_producers_and_consumers() {
        const PRODUCERS: usize = 3;
        const PER_PRODUCER: usize = 2_000;
        let q: Arc<LockFreeQueue<usize>> = Arc::new(LockFreeQueue::new());
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        q.enqueue(p * PER_PRODUCER + i).unwrap();
                    }
                })
            })
            .collect();
        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    let mut idle = 0;
                    while idle < 10_000 {
                        match q.dequeue() {
                            Some(v) => {
                                seen.push(v);
                                idle = 0;
                            }
                            None => {
                                idle += 1;
                                thread::yield_now();
                            }
                        }
                    }
                    seen
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        let mut all: Vec<usize> = consumers.into_iter().flat_map(|c| c.join().unwrap()).collect();
        while let Some(v) = q.dequeue() {
            all.push(v);
        }
        all.sort_unstable();
        assert_eq!(all, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<_>>());
    }
}
