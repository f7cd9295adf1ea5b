//! Pointers paired with a generation tag.
//!
//! The pointer and the tag are two separate words swapped together by the
//! double-word CAS in [`dcas`](crate::concurrency::atomic::arch::dcas). Every
//! successful update bumps the tag, so a CAS prepared against a stale
//! snapshot fails even if the pointer has come back to the same address.

use core::fmt;
use core::ptr;

use crate::concurrency::atomic::arch::dcas::{self, Dcas, DoubleWord};
use crate::concurrency::atomic::{Atomic, AtomicValue};
use crate::ordering::{CasOrdering, MemoryOrder};

/// A pointer to `N` and a wrapping generation counter.
pub struct TaggedPtr<N> {
    ptr: *mut N,
    tag: usize,
}

impl<N> TaggedPtr<N> {
    /// Pairs `ptr` with `tag`.
    #[inline(always)]
    pub const fn new(ptr: *mut N, tag: usize) -> Self {
        Self { ptr, tag }
    }

    /// A null pointer with tag 0.
    #[inline(always)]
    pub const fn null() -> Self {
        Self::new(ptr::null_mut(), 0)
    }

    /// The pointer.
    #[inline(always)]
    pub const fn ptr(self) -> *mut N {
        self.ptr
    }

    /// The tag.
    #[inline(always)]
    pub const fn tag(self) -> usize {
        self.tag
    }

    /// Same as [`ptr`](Self::ptr).
    #[inline(always)]
    pub const fn get_ptr(self) -> *mut N {
        self.ptr
    }

    /// Same as [`tag`](Self::tag).
    #[inline(always)]
    pub const fn get_tag(self) -> usize {
        self.tag
    }

    /// Replaces the pointer.
    #[inline(always)]
    pub fn set_ptr(&mut self, ptr: *mut N) {
        self.ptr = ptr;
    }

    /// Replaces the tag.
    #[inline(always)]
    pub fn set_tag(&mut self, tag: usize) {
        self.tag = tag;
    }

    /// Whether the pointer is null.
    #[inline(always)]
    pub fn is_null(self) -> bool {
        self.ptr.is_null()
    }

    /// `ptr` with this tag plus one.
    #[inline(always)]
    pub const fn with_next_tag(self, ptr: *mut N) -> Self {
        Self::new(ptr, self.tag.wrapping_add(1))
    }
}

impl<N> Clone for TaggedPtr<N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N> Copy for TaggedPtr<N> {}

impl<N> PartialEq for TaggedPtr<N> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.tag == other.tag
    }
}

impl<N> Eq for TaggedPtr<N> {}

impl<N> Default for TaggedPtr<N> {
    fn default() -> Self {
        Self::null()
    }
}

impl<N> fmt::Debug for TaggedPtr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedPtr")
            .field("ptr", &self.ptr)
            .field("tag", &self.tag)
            .finish()
    }
}

// SAFETY: a tagged pointer is two plain words; dereferencing it is up to the
// holder.
unsafe impl<N> AtomicValue for TaggedPtr<N> {
    type Repr = Dcas;

    #[inline(always)]
    fn into_repr(self) -> DoubleWord {
        dcas::pack(self.ptr as usize, self.tag)
    }

    #[inline(always)]
    fn from_repr(word: DoubleWord) -> Self {
        let (addr, tag) = dcas::unpack(word);
        Self::new(addr as *mut N, tag)
    }
}

/// A [`TaggedPtr`] updated by double-word CAS.
pub struct AtomicTaggedPtr<N> {
    inner: Atomic<TaggedPtr<N>>,
}

impl<N> AtomicTaggedPtr<N> {
    /// Creates a cell holding `value`.
    #[inline]
    pub fn new(value: TaggedPtr<N>) -> Self {
        Self {
            inner: Atomic::new(value),
        }
    }

    /// A cell holding a null pointer with tag 0.
    #[inline]
    pub fn null() -> Self {
        Self::new(TaggedPtr::null())
    }

    /// Loads the pair.
    #[inline(always)]
    pub fn load(&self, order: impl Into<MemoryOrder>) -> TaggedPtr<N> {
        self.inner.load(order)
    }

    /// Stores the pair.
    #[inline(always)]
    pub fn store(&self, value: TaggedPtr<N>, order: impl Into<MemoryOrder>) {
        self.inner.store(value, order);
    }

    /// Replaces `(old_ptr, old_tag)` with `(new_ptr, new_tag)`, `SeqCst`.
    #[inline]
    pub fn compare_and_swap(
        &self,
        old_ptr: *mut N,
        old_tag: usize,
        new_ptr: *mut N,
        new_tag: usize,
    ) -> bool {
        let mut expected = TaggedPtr::new(old_ptr, old_tag);
        self.inner.compare_exchange_strong(
            &mut expected,
            TaggedPtr::new(new_ptr, new_tag),
            MemoryOrder::SeqCst,
        )
    }

    /// Replaces `old` with `new_ptr`, bumping the tag, `SeqCst`.
    #[inline]
    pub fn compare_and_swap_ptr(&self, old: TaggedPtr<N>, new_ptr: *mut N) -> bool {
        let mut expected = old;
        self.inner
            .compare_exchange_strong(&mut expected, old.with_next_tag(new_ptr), MemoryOrder::SeqCst)
    }

    /// Weak CAS; on failure `expected` receives the observed pair.
    #[inline(always)]
    pub fn compare_exchange_weak(
        &self,
        expected: &mut TaggedPtr<N>,
        desired: TaggedPtr<N>,
        order: impl CasOrdering,
    ) -> bool {
        self.inner.compare_exchange_weak(expected, desired, order)
    }

    /// Strong CAS; on failure `expected` receives the observed pair.
    #[inline(always)]
    pub fn compare_exchange_strong(
        &self,
        expected: &mut TaggedPtr<N>,
        desired: TaggedPtr<N>,
        order: impl CasOrdering,
    ) -> bool {
        self.inner.compare_exchange_strong(expected, desired, order)
    }

    /// Whether the double-word CAS is a hardware instruction here.
    #[inline]
    pub fn is_lock_free(&self) -> bool {
        self.inner.is_lock_free()
    }
}

impl<N> Default for AtomicTaggedPtr<N> {
    fn default() -> Self {
        Self::null()
    }
}

impl<N> fmt::Debug for AtomicTaggedPtr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicTaggedPtr")
            .field(&self.load(MemoryOrder::Relaxed))
            .finish()
    }
}
