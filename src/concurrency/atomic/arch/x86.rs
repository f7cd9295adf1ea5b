//! x86 and x86-64.
//!
//! Every word size has native CAS (`lock cmpxchg`), exchange (`xchg`) and
//! fetch-add (`lock xadd`). Plain loads are already acquire and plain stores
//! already release, so only `SeqCst` stores need more than a `mov`: they go
//! through an exchange.

use super::MinimalAtomic;
use crate::concurrency::atomic::builder::{ExchangeAtomic, FetchAddAtomic, FromAdd};
use crate::concurrency::atomic::word::NativeWord;
use crate::ordering::MemoryOrder;

/// A hardware word with native CAS, exchange and fetch-add.
#[repr(transparent)]
pub struct X86<W: NativeWord> {
    cell: W::Cell,
}

impl<W: NativeWord> MinimalAtomic for X86<W> {
    type Word = W;

    #[inline(always)]
    fn new(value: W) -> Self {
        Self { cell: W::cell(value) }
    }

    #[inline(always)]
    fn load(&self, order: MemoryOrder) -> W {
        W::load(&self.cell, order.to_std())
    }

    #[inline(always)]
    fn store(&self, value: W, order: MemoryOrder) {
        if order == MemoryOrder::SeqCst {
            W::swap(&self.cell, value, order.to_std());
        } else {
            W::store(&self.cell, value, order.to_std());
        }
    }

    #[inline(always)]
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

impl<W: NativeWord> ExchangeAtomic for X86<W> {
    #[inline(always)]
    fn compare_exchange_strong(
        &self,
        expected: &mut W,
        desired: W,
        success: MemoryOrder,
        failure: MemoryOrder,
    ) -> bool {
        match W::compare_exchange(&self.cell, *expected, desired, success.to_std(), failure.to_std()) {
            Ok(_) => true,
            Err(observed) => {
                *expected = observed;
                false
            }
        }
    }

    #[inline(always)]
    fn exchange(&self, value: W, order: MemoryOrder) -> W {
        W::swap(&self.cell, value, order.to_std())
    }
}

impl<W: NativeWord> FetchAddAtomic for X86<W> {
    #[inline(always)]
    fn fetch_add(&self, value: W, order: MemoryOrder) -> W {
        W::fetch_add(&self.cell, value, order.to_std())
    }
}

/// A full integral atomic on `W`.
pub type Integer<W> = FromAdd<X86<W>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::atomic::builder::{ArithmeticAtomic, LogicAtomic};
    use MemoryOrder::*;

    #[test]
    fn native_operations() {
        let a = Integer::<u8>::new(250);
        assert_eq!(a.fetch_add(10, AcqRel), 250);
        assert_eq!(a.load(Acquire), 4);
        assert_eq!(a.fetch_sub(5, Release), 4);
        assert_eq!(a.load(Relaxed), 255);
        assert_eq!(a.fetch_and(0x0F, SeqCst), 255);
        assert_eq!(a.exchange(1, SeqCst), 0x0F);
        a.store(9, SeqCst);
        assert_eq!(a.load(SeqCst), 9);
        assert!(a.is_lock_free());
    }

    #[test]
    fn cas_reports_observed() {
        let a = X86::<u64>::new(3);
        let mut expected = 4;
        assert!(!a.compare_exchange_weak(&mut expected, 5, SeqCst, Relaxed));
        assert_eq!(expected, 3);
        assert!(a.compare_exchange_weak(&mut expected, 5, SeqCst, Relaxed));
        assert_eq!(a.load(SeqCst), 5);
    }
}
