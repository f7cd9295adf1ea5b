//! Wait-free single-producer single-consumer ring buffers.
//!
//! One slot always stays empty so that `read == write` means empty and
//! `next(write) == read` means full. The producer owns `write`, the consumer
//! owns `read`; each publishes its index with `Release` and observes the
//! other's with `Acquire`.
//!
//! Calling `enqueue`/`dequeue` on the buffer itself needs `&mut self`. To
//! run the two sides on different threads, [`split`](RingBuffer::split) the
//! buffer into a [`Producer`] and a [`Consumer`].

use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomData;
use core::mem::MaybeUninit;

use super::CapacityError;
use crate::concurrency::atomic::Atomic;
use crate::concurrency::CachePadded;
use crate::ordering::MemoryOrder::{Acquire, Relaxed, Release};
use crate::tracing_helpers::debug_log;

type Slot<T> = UnsafeCell<MaybeUninit<T>>;

struct Indices {
    write: CachePadded<Atomic<usize>>,
    read: CachePadded<Atomic<usize>>,
}

impl Indices {
    fn new() -> Self {
        Self {
            write: CachePadded::new(Atomic::new(0)),
            read: CachePadded::new(Atomic::new(0)),
        }
    }

    fn is_empty(&self) -> bool {
        self.read.load(Acquire) == self.write.load(Acquire)
    }

    fn len(&self, slots: usize) -> usize {
        let write = self.write.load(Acquire);
        let read = self.read.load(Acquire);
        if write >= read {
            write - read
        } else {
            slots - read + write
        }
    }
}

#[inline(always)]
fn next_index(index: usize, slots: usize) -> usize {
    let next = index + 1;
    if next == slots {
        0
    } else {
        next
    }
}

/// # Safety
/// At most one thread may enqueue into `slots` at a time.
unsafe fn enqueue_in<T>(indices: &Indices, slots: &[Slot<T>], value: T) -> Result<(), CapacityError<T>> {
    let write = indices.write.load(Relaxed);
    let next = next_index(write, slots.len());
    if next == indices.read.load(Acquire) {
        return Err(CapacityError(value));
    }
    (*slots[write].get()).write(value);
    indices.write.store(next, Release);
    Ok(())
}

/// # Safety
/// At most one thread may dequeue from `slots` at a time.
unsafe fn dequeue_in<T>(indices: &Indices, slots: &[Slot<T>]) -> Option<T> {
    let read = indices.read.load(Relaxed);
    if read == indices.write.load(Acquire) {
        return None;
    }
    let value = (*slots[read].get()).assume_init_read();
    indices.read.store(next_index(read, slots.len()), Release);
    Some(value)
}

fn drain<T>(indices: &mut Indices, slots: &[Slot<T>]) {
    // SAFETY: exclusive access rules out any other producer or consumer.
    while unsafe { dequeue_in(indices, slots) }.is_some() {}
    indices.write.store(0, Relaxed);
    indices.read.store(0, Relaxed);
}

/// A ring buffer with `N` inline slots, holding up to `N - 1` elements.
///
/// ```
/// use halo_atomic::RingBuffer;
///
/// let mut ring = RingBuffer::<u32, 4>::new();
/// let (mut tx, mut rx) = ring.split();
/// std::thread::scope(|s| {
///     s.spawn(move || {
///         for i in 0..100 {
///             while tx.enqueue(i).is_err() {
///                 std::hint::spin_loop();
///             }
///         }
///     });
///     let mut next = 0;
///     while next < 100 {
///         if let Some(v) = rx.dequeue() {
///             assert_eq!(v, next);
///             next += 1;
///         }
///     }
/// });
/// ```
pub struct RingBuffer<T, const N: usize> {
    indices: Indices,
    slots: [Slot<T>; N],
}

impl<T, const N: usize> RingBuffer<T, N> {
    /// An empty buffer.
    pub fn new() -> Self {
        const { assert!(N >= 2, "a ring buffer needs at least two slots") };
        Self {
            indices: Indices::new(),
            slots: core::array::from_fn(|_| UnsafeCell::new(MaybeUninit::uninit())),
        }
    }

    /// Appends `value`, or hands it back if the buffer is full.
    pub fn enqueue(&mut self, value: T) -> Result<(), CapacityError<T>> {
        // SAFETY: `&mut self` excludes every other producer.
        unsafe { enqueue_in(&self.indices, &self.slots, value) }
    }

    /// Removes the oldest element.
    pub fn dequeue(&mut self) -> Option<T> {
        // SAFETY: `&mut self` excludes every other consumer.
        unsafe { dequeue_in(&self.indices, &self.slots) }
    }

    /// Whether no element is buffered.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of buffered elements.
    pub fn len(&self) -> usize {
        self.indices.len(N)
    }

    /// Maximum number of buffered elements, `N - 1`.
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Drops every buffered element and rewinds both indices.
    pub fn reset(&mut self) {
        drain(&mut self.indices, &self.slots);
    }

    /// Splits the buffer into its two ends.
    pub fn split(&mut self) -> (Producer<'_, T>, Consumer<'_, T>) {
        split_parts(&self.indices, &self.slots)
    }
}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Drop for RingBuffer<T, N> {
    fn drop(&mut self) {
        drain(&mut self.indices, &self.slots);
    }
}

impl<T, const N: usize> fmt::Debug for RingBuffer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

// SAFETY: the buffer owns its elements; shared access only reads indices.
unsafe impl<T: Send, const N: usize> Send for RingBuffer<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for RingBuffer<T, N> {}

/// A ring buffer whose capacity is chosen at run time.
pub struct DynRingBuffer<T> {
    indices: Indices,
    slots: Box<[Slot<T>]>,
}

impl<T> DynRingBuffer<T> {
    /// An empty buffer holding up to `capacity` elements.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        debug_log!(capacity, "ring buffer created");
        Self {
            indices: Indices::new(),
            slots: (0..=capacity).map(|_| UnsafeCell::new(MaybeUninit::uninit())).collect(),
        }
    }

    /// Appends `value`, or hands it back if the buffer is full.
    pub fn enqueue(&mut self, value: T) -> Result<(), CapacityError<T>> {
        // SAFETY: `&mut self` excludes every other producer.
        unsafe { enqueue_in(&self.indices, &self.slots, value) }
    }

    /// Removes the oldest element.
    pub fn dequeue(&mut self) -> Option<T> {
        // SAFETY: `&mut self` excludes every other consumer.
        unsafe { dequeue_in(&self.indices, &self.slots) }
    }

    /// Whether no element is buffered.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of buffered elements.
    pub fn len(&self) -> usize {
        self.indices.len(self.slots.len())
    }

    /// Maximum number of buffered elements.
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Drops every buffered element and rewinds both indices.
    pub fn reset(&mut self) {
        drain(&mut self.indices, &self.slots);
    }

    /// Splits the buffer into its two ends.
    pub fn split(&mut self) -> (Producer<'_, T>, Consumer<'_, T>) {
        split_parts(&self.indices, &self.slots)
    }
}

impl<T> Drop for DynRingBuffer<T> {
    fn drop(&mut self) {
        drain(&mut self.indices, &self.slots);
    }
}

impl<T> fmt::Debug for DynRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynRingBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

// SAFETY: as for `RingBuffer`.
unsafe impl<T: Send> Send for DynRingBuffer<T> {}
unsafe impl<T: Send> Sync for DynRingBuffer<T> {}

fn split_parts<'a, T>(indices: &'a Indices, slots: &'a [Slot<T>]) -> (Producer<'a, T>, Consumer<'a, T>) {
    (
        Producer {
            indices,
            slots,
            _not_sync: PhantomData,
        },
        Consumer {
            indices,
            slots,
            _not_sync: PhantomData,
        },
    )
}

/// The writing end of a split ring buffer.
pub struct Producer<'a, T> {
    indices: &'a Indices,
    slots: &'a [Slot<T>],
    _not_sync: PhantomData<*mut T>,
}

impl<T> Producer<'_, T> {
    /// Appends `value`, or hands it back if the buffer is full.
    pub fn enqueue(&mut self, value: T) -> Result<(), CapacityError<T>> {
        // SAFETY: there is exactly one producer per split and it is not Sync.
        unsafe { enqueue_in(self.indices, self.slots, value) }
    }

    /// Whether the buffer has no free slot.
    pub fn is_full(&self) -> bool {
        next_index(self.indices.write.load(Relaxed), self.slots.len()) == self.indices.read.load(Acquire)
    }

    /// Maximum number of buffered elements.
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }
}

/// The reading end of a split ring buffer.
pub struct Consumer<'a, T> {
    indices: &'a Indices,
    slots: &'a [Slot<T>],
    _not_sync: PhantomData<*mut T>,
}

impl<T> Consumer<'_, T> {
    /// Removes the oldest element.
    pub fn dequeue(&mut self) -> Option<T> {
        // SAFETY: there is exactly one consumer per split and it is not Sync.
        unsafe { dequeue_in(self.indices, self.slots) }
    }

    /// Whether no element is buffered.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of buffered elements.
    pub fn len(&self) -> usize {
        self.indices.len(self.slots.len())
    }
}

// SAFETY: each end may move to another thread; values cross with it.
unsafe impl<T: Send> Send for Producer<'_, T> {}
unsafe impl<T: Send> Send for Consumer<'_, T> {}

impl<T> fmt::Debug for Producer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("full", &self.is_full()).finish()
    }
}

impl<T> fmt::Debug for Consumer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("len", &self.len()).finish()
    }
}
