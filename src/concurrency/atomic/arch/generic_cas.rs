//! Targets that only offer a fully fenced compare-and-swap.
//!
//! Everything is built on one strong, sequentially consistent CAS on 4- and
//! 8-byte words: a load is `CAS(v, v)`, a store is an exchange, and the
//! exchange is a CAS loop. The requested orders are ignored because every
//! operation is already `SeqCst`.

use core::sync::atomic::Ordering::{Relaxed, SeqCst};

use super::MinimalAtomic;
use crate::concurrency::atomic::builder::{ExchangeAtomic, FromExchange, FromLarger};
use crate::concurrency::atomic::word::NativeWord;
use crate::ordering::MemoryOrder;

/// A word whose only primitive is a fully fenced CAS.
#[repr(transparent)]
pub struct GenericCas<W: NativeWord> {
    cell: W::Cell,
}

impl<W: NativeWord> GenericCas<W> {
    /// The one hardware primitive: returns the value found in the cell.
    #[inline(always)]
    fn fenced_cas(&self, expected: W, desired: W) -> W {
        match W::compare_exchange(&self.cell, expected, desired, SeqCst, SeqCst) {
            Ok(found) | Err(found) => found,
        }
    }
}

impl<W: NativeWord> MinimalAtomic for GenericCas<W> {
    type Word = W;

    #[inline(always)]
    fn new(value: W) -> Self {
        Self { cell: W::cell(value) }
    }

    fn load(&self, _order: MemoryOrder) -> W {
        // The relaxed read is only a first guess; the CAS confirms it.
        let mut guess = W::load(&self.cell, Relaxed);
        loop {
            let found = self.fenced_cas(guess, guess);
            if found == guess {
                return found;
            }
            guess = found;
        }
    }

    #[inline]
    fn store(&self, value: W, order: MemoryOrder) {
        self.exchange(value, order);
    }

    #[inline]
    fn compare_exchange_weak(
        &self,
        expected: &mut W,
        desired: W,
        success: MemoryOrder,
        failure: MemoryOrder,
    ) -> bool {
        self.compare_exchange_strong(expected, desired, success, failure)
    }

    #[inline(always)]
    fn is_lock_free(&self) -> bool {
        true
    }
}

impl<W: NativeWord> ExchangeAtomic for GenericCas<W> {
    #[inline]
    fn compare_exchange_strong(
        &self,
        expected: &mut W,
        desired: W,
        _success: MemoryOrder,
        _failure: MemoryOrder,
    ) -> bool {
        let found = self.fenced_cas(*expected, desired);
        let success = found == *expected;
        *expected = found;
        success
    }

    fn exchange(&self, value: W, _order: MemoryOrder) -> W {
        let mut current = W::load(&self.cell, Relaxed);
        loop {
            let found = self.fenced_cas(current, value);
            if found == current {
                return found;
            }
            current = found;
        }
    }
}

/// A full integral atomic on a native word.
pub type Integer<W> = FromExchange<GenericCas<W>>;

/// A full integral atomic on a 1- or 2-byte word.
pub type Embedded<S> = FromLarger<GenericCas<u32>, S>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::atomic::builder::{ArithmeticAtomic, FetchAddAtomic, LogicAtomic};
    use crate::ordering::MemoryOrder::{Acquire, Relaxed, Release, SeqCst};

    #[test]
    fn load_never_changes_the_value() {
        let a = GenericCas::<u32>::new(0xDEAD_BEEF);
        for _ in 0..4 {
            assert_eq!(a.load(Relaxed), 0xDEAD_BEEF);
        }
        a.store(1, Release);
        assert_eq!(a.load(Acquire), 1);
    }

    #[test]
    fn derived_integral_ops() {
        let a = Integer::<u64>::new(u64::MAX);
        assert_eq!(a.fetch_add(1, SeqCst), u64::MAX);
        assert_eq!(a.post_increment(SeqCst), 0);
        assert_eq!(a.fetch_and(0, SeqCst), 1);
        assert_eq!(a.exchange(12, SeqCst), 0);
        let mut expected = 12;
        assert!(a.compare_exchange_strong(&mut expected, 13, SeqCst, SeqCst));
        assert_eq!(a.load(SeqCst), 13);
    }

    #[test]
    fn embedded_word() {
        let a = Embedded::<u16>::new(7);
        assert_eq!(a.add_fetch(3, SeqCst), 10);
        assert!(a.is_lock_free());
    }
}
