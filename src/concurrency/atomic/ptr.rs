//! Raw pointers in an `Atomic`, stored as their address.
//!
//! Only load, store, exchange and compare-exchange are available; pointers
//! are not [`AtomicInteger`](super::AtomicInteger).

use core::ptr;

use super::arch::platform::AtomicAddr;
use super::handle::{Atomic, AtomicValue};

// SAFETY: sharing a raw pointer value between threads is sound; using it is
// the caller's concern, as with `AtomicPtr`.
unsafe impl<U> AtomicValue for *mut U {
    type Repr = AtomicAddr;

    #[inline(always)]
    fn into_repr(self) -> usize {
        self as usize
    }

    #[inline(always)]
    fn from_repr(word: usize) -> Self {
        word as *mut U
    }
}

// SAFETY: as for `*mut U`.
unsafe impl<U> AtomicValue for *const U {
    type Repr = AtomicAddr;

    #[inline(always)]
    fn into_repr(self) -> usize {
        self as usize
    }

    #[inline(always)]
    fn from_repr(word: usize) -> Self {
        word as *const U
    }
}

impl<U> Atomic<*mut U> {
    /// An atomic null pointer.
    #[inline]
    pub fn null() -> Self {
        Self::new(ptr::null_mut())
    }
}

impl<U> Atomic<*const U> {
    /// An atomic null pointer.
    #[inline]
    pub fn null() -> Self {
        Self::new(ptr::null())
    }
}
