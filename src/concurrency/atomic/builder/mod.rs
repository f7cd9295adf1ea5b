//! Layered construction of full atomics from minimal backends.
//!
//! A backend implements [`MinimalAtomic`] and, where the hardware allows,
//! some of the richer traits below. Each wrapper in this module derives one
//! more trait from the ones beneath it and forwards everything else
//! unchanged, so a full integral atomic is a stack of zero-sized layers:
//!
//! ```text
//! LogicFromCas<ArithmeticFromAdd<FetchAddFromCas<ExchangeFromCas<B>>>>
//! ```
//!
//! The stacks are chosen statically, per backend, through the `From*`
//! aliases. There is no dynamic dispatch anywhere.

mod derive;
mod sub_word;

pub use derive::{ArithmeticFromAdd, ConstFetchAdd, ExchangeFromCas, FetchAddFromCas, LogicFromCas};
pub use sub_word::SubWord;

pub use super::arch::MinimalAtomic;
use crate::ordering::MemoryOrder;

/// Strong compare-exchange and exchange.
pub trait ExchangeAtomic: MinimalAtomic {
    /// Like [`MinimalAtomic::compare_exchange_weak`] but never fails
    /// spuriously.
    fn compare_exchange_strong(
        &self,
        expected: &mut Self::Word,
        desired: Self::Word,
        success: MemoryOrder,
        failure: MemoryOrder,
    ) -> bool;

    /// Stores `value`, returning the previous value.
    fn exchange(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
}

/// Wrapping fetch-add.
pub trait FetchAddAtomic: ExchangeAtomic {
    /// Adds `value`, returning the previous value.
    fn fetch_add(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
}

/// The arithmetic operations derivable from fetch-add.
pub trait ArithmeticAtomic: FetchAddAtomic {
    /// Subtracts `value`, returning the previous value.
    fn fetch_sub(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
    /// Adds `value`, returning the new value.
    fn add_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
    /// Subtracts `value`, returning the new value.
    fn sub_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
    /// `++x`
    fn pre_increment(&self, order: MemoryOrder) -> Self::Word;
    /// `x++`
    fn post_increment(&self, order: MemoryOrder) -> Self::Word;
    /// `--x`
    fn pre_decrement(&self, order: MemoryOrder) -> Self::Word;
    /// `x--`
    fn post_decrement(&self, order: MemoryOrder) -> Self::Word;
}

/// Bitwise read-modify-write operations.
pub trait LogicAtomic: ExchangeAtomic {
    /// Bitwise AND, returning the previous value.
    fn fetch_and(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
    /// Bitwise OR, returning the previous value.
    fn fetch_or(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
    /// Bitwise XOR, returning the previous value.
    fn fetch_xor(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
    /// Bitwise AND, returning the new value.
    fn and_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
    /// Bitwise OR, returning the new value.
    fn or_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
    /// Bitwise XOR, returning the new value.
    fn xor_fetch(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
}

/// Backends with dedicated increment and decrement sequences.
///
/// [`ConstFetchAdd`] routes constant `+1`/`-1` operands here.
pub trait FetchIncDec: MinimalAtomic {
    /// Adds an arbitrary `value`, returning the previous value.
    fn fetch_add_var(&self, value: Self::Word, order: MemoryOrder) -> Self::Word;
    /// Adds one, returning the previous value.
    fn fetch_inc(&self, order: MemoryOrder) -> Self::Word;
    /// Subtracts one, returning the previous value.
    fn fetch_dec(&self, order: MemoryOrder) -> Self::Word;
}

/// Everything an integer atomic supports.
pub trait IntegralAtomic: ArithmeticAtomic + LogicAtomic {}

impl<A: ArithmeticAtomic + LogicAtomic> IntegralAtomic for A {}

/// A full integral atomic from a backend that only has weak CAS.
pub type FromMinimal<B> = LogicFromCas<ArithmeticFromAdd<FetchAddFromCas<ExchangeFromCas<B>>>>;

/// A full integral atomic from a backend with strong CAS and exchange.
pub type FromExchange<B> = LogicFromCas<ArithmeticFromAdd<FetchAddFromCas<B>>>;

/// A full integral atomic from a backend with native fetch-add.
pub type FromAdd<B> = LogicFromCas<ArithmeticFromAdd<B>>;

/// A full integral atomic from a backend with exchange and dedicated
/// increment/decrement.
pub type FromTypical<B> = LogicFromCas<ArithmeticFromAdd<ConstFetchAdd<B>>>;

/// A full integral atomic of word `S` embedded in a larger word held by `B`.
pub type FromLarger<B, S> = FromMinimal<SubWord<B, S>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::atomic::arch::fallback::Locked;

    // A fallback cell restricted to weak CAS, so every layer above it has to
    // be derived.
    struct OnlyCas(Locked<u16>);

    impl MinimalAtomic for OnlyCas {
        type Word = u16;

        fn new(value: u16) -> Self {
            Self(Locked::new(value))
        }

        fn load(&self, order: MemoryOrder) -> u16 {
            self.0.load(order)
        }

        fn store(&self, value: u16, order: MemoryOrder) {
            self.0.store(value, order);
        }

        fn compare_exchange_weak(
            &self,
            expected: &mut u16,
            desired: u16,
            success: MemoryOrder,
            failure: MemoryOrder,
        ) -> bool {
            self.0.compare_exchange_weak(expected, desired, success, failure)
        }

        fn is_lock_free(&self) -> bool {
            false
        }
    }

    #[test]
    fn derived_stack_matches_wrapping_arithmetic() {
        use MemoryOrder::SeqCst;
        let a = FromMinimal::<OnlyCas>::new(0xFFFE);
        assert_eq!(a.fetch_add(3, SeqCst), 0xFFFE);
        assert_eq!(a.load(SeqCst), 1);
        assert_eq!(a.fetch_sub(2, SeqCst), 1);
        assert_eq!(a.load(SeqCst), 0xFFFF);
        assert_eq!(a.pre_increment(SeqCst), 0);
        assert_eq!(a.post_decrement(SeqCst), 0);
        assert_eq!(a.fetch_or(0x0F00, SeqCst), 0xFFFF);
        assert_eq!(a.and_fetch(0x00F0, SeqCst), 0x00F0);
        assert_eq!(a.xor_fetch(0x00FF, SeqCst), 0x000F);
        assert_eq!(a.exchange(7, SeqCst), 0x000F);

        let mut expected = 8;
        assert!(!a.compare_exchange_strong(&mut expected, 1, SeqCst, SeqCst));
        assert_eq!(expected, 7);
        assert!(a.compare_exchange_strong(&mut expected, 1, SeqCst, SeqCst));
        assert_eq!(a.load(SeqCst), 1);
        assert!(!a.is_lock_free());
    }
}
