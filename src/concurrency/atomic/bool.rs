//! `Atomic<bool>`, stored as one byte.

use super::arch::platform::Atomic8;
use super::handle::{Atomic, AtomicValue};
use crate::ordering::MemoryOrder;

// SAFETY: `bool` is `Send`, and every byte decodes (non-zero is `true`).
unsafe impl AtomicValue for bool {
    type Repr = Atomic8;

    #[inline(always)]
    fn into_repr(self) -> u8 {
        u8::from(self)
    }

    #[inline(always)]
    fn from_repr(word: u8) -> Self {
        word != 0
    }
}

impl Atomic<bool> {
    /// Sets the value to `true` if it is currently `false`.
    ///
    /// Returns `true` if this call did the setting.
    #[inline]
    pub fn try_set(&self, order: impl Into<MemoryOrder>) -> bool {
        let mut expected = false;
        self.compare_exchange_strong(&mut expected, true, order.into())
    }

    /// Stores `true`, returning the previous value.
    #[inline]
    pub fn fetch_set(&self, order: impl Into<MemoryOrder>) -> bool {
        self.exchange(true, order)
    }

    /// Stores `false`, returning the previous value.
    #[inline]
    pub fn fetch_clear(&self, order: impl Into<MemoryOrder>) -> bool {
        self.exchange(false, order)
    }
}
