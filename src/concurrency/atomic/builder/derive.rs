//! The derivation layers.
//!
//! Each wrapper is a transparent newtype around the layer beneath it. It
//! implements one trait from the layer beneath and forwards every trait the
//! inner layer already has, so layers can be stacked in any order the bounds
//! allow.

use num_traits::{One, WrappingAdd, WrappingSub};

use super::{
    ArithmeticAtomic, ExchangeAtomic, FetchAddAtomic, FetchIncDec, LogicAtomic, MinimalAtomic,
};
use crate::concurrency::atomic::word::Integral;
use crate::ordering::MemoryOrder;

/// Derives strong CAS and exchange from weak CAS.
#[repr(transparent)]
pub struct ExchangeFromCas<B> {
    inner: B,
}

/// Derives fetch-add from strong CAS.
#[repr(transparent)]
pub struct FetchAddFromCas<B> {
    inner: B,
}

/// Derives fetch-add from dedicated increment/decrement sequences.
#[repr(transparent)]
pub struct ConstFetchAdd<B> {
    inner: B,
}

/// Derives subtraction and the increment/decrement forms from fetch-add.
#[repr(transparent)]
pub struct ArithmeticFromAdd<B> {
    inner: B,
}

/// Derives the bitwise operations from strong CAS.
#[repr(transparent)]
pub struct LogicFromCas<B> {
    inner: B,
}

macro_rules! forward_minimal {
    ($($wrapper:ident),*) => {$(
        impl<B: MinimalAtomic> MinimalAtomic for $wrapper<B> {
            type Word = B::Word;

            #[inline(always)]
            fn new(value: Self::Word) -> Self {
                Self { inner: B::new(value) }
            }

            #[inline(always)]
            fn load(&self, order: MemoryOrder) -> Self::Word {
                self.inner.load(order)
            }

            #[inline(always)]
            fn store(&self, value: Self::Word, order: MemoryOrder) {
                self.inner.store(value, order);
            }

            #[inline(always)]
            fn compare_exchange_weak(
                &self,
                expected: &mut Self::Word,
                desired: Self::Word,
                success: MemoryOrder,
                failure: MemoryOrder,
            ) -> bool {
                self.inner.compare_exchange_weak(expected, desired, success, failure)
            }

            #[inline(always)]
            fn is_lock_free(&self) -> bool {
                self.inner.is_lock_free()
            }
        }
    )*};
}

macro_rules! forward_exchange {
    ($($wrapper:ident),*) => {$(
        impl<B: ExchangeAtomic> ExchangeAtomic for $wrapper<B> {
            #[inline(always)]
            fn compare_exchange_strong(
                &self,
                expected: &mut Self::Word,
                desired: Self::Word,
                success: MemoryOrder,
                failure: MemoryOrder,
            ) -> bool {
                self.inner.compare_exchange_strong(expected, desired, success, failure)
            }

            #[inline(always)]
            fn exchange(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
                self.inner.exchange(value, order)
            }
        }
    )*};
}

macro_rules! forward_fetch_add {
    ($($wrapper:ident),*) => {$(
        impl<B: FetchAddAtomic> FetchAddAtomic for $wrapper<B> {
            #[inline(always)]
            fn fetch_add(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
                self.inner.fetch_add(value, order)
            }
        }
    )*};
}

forward_minimal!(ExchangeFromCas, FetchAddFromCas, ConstFetchAdd, ArithmeticFromAdd, LogicFromCas);
forward_exchange!(FetchAddFromCas, ConstFetchAdd, ArithmeticFromAdd, LogicFromCas);
forward_fetch_add!(LogicFromCas);

impl<B: MinimalAtomic> ExchangeAtomic for ExchangeFromCas<B> {
    fn compare_exchange_strong(
        &self,
        expected: &mut Self::Word,
        desired: Self::Word,
        success: MemoryOrder,
        failure: MemoryOrder,
    ) -> bool {
        let saved = *expected;
        loop {
            if self.inner.compare_exchange_weak(expected, desired, success, failure) {
                return true;
            }
            // A spurious failure reports the value we expected.
            if *expected != saved {
                return false;
            }
        }
    }

    fn exchange(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        let mut current = self.inner.load(MemoryOrder::Relaxed);
        while !self
            .inner
            .compare_exchange_weak(&mut current, value, order, MemoryOrder::Relaxed)
        {}
        current
    }
}

impl<B: FetchIncDec> FetchIncDec for ExchangeFromCas<B> {
    #[inline(always)]
    fn fetch_add_var(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.inner.fetch_add_var(value, order)
    }

    #[inline(always)]
    fn fetch_inc(&self, order: MemoryOrder) -> Self::Word {
        self.inner.fetch_inc(order)
    }

    #[inline(always)]
    fn fetch_dec(&self, order: MemoryOrder) -> Self::Word {
        self.inner.fetch_dec(order)
    }
}

impl<B> FetchAddAtomic for FetchAddFromCas<B>
where
    B: ExchangeAtomic,
    B::Word: Integral,
{
    fn fetch_add(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        let mut current = self.inner.load(MemoryOrder::Relaxed);
        loop {
            let new = current.wrapping_add(&value);
            if self
                .inner
                .compare_exchange_weak(&mut current, new, order, MemoryOrder::Relaxed)
            {
                return current;
            }
        }
    }
}

impl<B> FetchAddAtomic for ConstFetchAdd<B>
where
    B: ExchangeAtomic + FetchIncDec,
    B::Word: Integral,
{
    #[inline(always)]
    fn fetch_add(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        // Folds to a single arm when `value` is a constant.
        if value.is_one() {
            self.inner.fetch_inc(order)
        } else if value == <B::Word as One>::one().negate() {
            self.inner.fetch_dec(order)
        } else {
            self.inner.fetch_add_var(value, order)
        }
    }
}

impl<B> ArithmeticAtomic for ArithmeticFromAdd<B>
where
    B: FetchAddAtomic,
    B::Word: Integral,
{
    #[inline]
    fn fetch_sub(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.inner.fetch_add(value.negate(), order)
    }

    #[inline]
    fn add_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.inner.fetch_add(value, order).wrapping_add(&value)
    }

    #[inline]
    fn sub_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.fetch_sub(value, order).wrapping_sub(&value)
    }

    #[inline]
    fn pre_increment(&self, order: MemoryOrder) -> Self::Word {
        self.add_fetch(<B::Word as One>::one(), order)
    }

    #[inline]
    fn post_increment(&self, order: MemoryOrder) -> Self::Word {
        self.inner.fetch_add(<B::Word as One>::one(), order)
    }

    #[inline]
    fn pre_decrement(&self, order: MemoryOrder) -> Self::Word {
        self.sub_fetch(<B::Word as One>::one(), order)
    }

    #[inline]
    fn post_decrement(&self, order: MemoryOrder) -> Self::Word {
        self.fetch_sub(<B::Word as One>::one(), order)
    }
}

impl<B: FetchAddAtomic> FetchAddAtomic for ArithmeticFromAdd<B> {
    #[inline(always)]
    fn fetch_add(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.inner.fetch_add(value, order)
    }
}

impl<B: ArithmeticAtomic> ArithmeticAtomic for LogicFromCas<B> {
    #[inline(always)]
    fn fetch_sub(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.inner.fetch_sub(value, order)
    }

    #[inline(always)]
    fn add_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.inner.add_fetch(value, order)
    }

    #[inline(always)]
    fn sub_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.inner.sub_fetch(value, order)
    }

    #[inline(always)]
    fn pre_increment(&self, order: MemoryOrder) -> Self::Word {
        self.inner.pre_increment(order)
    }

    #[inline(always)]
    fn post_increment(&self, order: MemoryOrder) -> Self::Word {
        self.inner.post_increment(order)
    }

    #[inline(always)]
    fn pre_decrement(&self, order: MemoryOrder) -> Self::Word {
        self.inner.pre_decrement(order)
    }

    #[inline(always)]
    fn post_decrement(&self, order: MemoryOrder) -> Self::Word {
        self.inner.post_decrement(order)
    }
}

impl<B> LogicFromCas<B>
where
    B: ExchangeAtomic,
    B::Word: Integral,
{
    /// Applies `op` in a CAS loop, returning `(previous, new)`.
    #[inline]
    fn update(
        &self,
        order: MemoryOrder,
        op: impl Fn(B::Word) -> B::Word,
    ) -> (B::Word, B::Word) {
        let mut current = self.inner.load(MemoryOrder::Relaxed);
        loop {
            let new = op(current);
            if self
                .inner
                .compare_exchange_weak(&mut current, new, order, MemoryOrder::Relaxed)
            {
                return (current, new);
            }
        }
    }
}

impl<B> LogicAtomic for LogicFromCas<B>
where
    B: ExchangeAtomic,
    B::Word: Integral,
{
    fn fetch_and(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.update(order, |v| v & value).0
    }

    fn fetch_or(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.update(order, |v| v | value).0
    }

    fn fetch_xor(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.update(order, |v| v ^ value).0
    }

    fn and_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.update(order, |v| v & value).1
    }

    fn or_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.update(order, |v| v | value).1
    }

    fn xor_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word {
        self.update(order, |v| v ^ value).1
    }
}
