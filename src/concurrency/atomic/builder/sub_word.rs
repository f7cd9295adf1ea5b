//! One- and two-byte atomics embedded in a larger word.
//!
//! The logical value occupies `S::BYTES` bytes at a fixed byte offset of a
//! word held by a backend that only supports larger words. Every write is a
//! CAS on the whole word that leaves the neighbouring bytes as they were.
//!
//! The embedding word must be exclusively owned by this cell. Nothing stops
//! a different-sized atomic elsewhere from overlapping the same bytes, and
//! the result of doing so is unspecified.

use core::marker::PhantomData;

use num_traits::AsPrimitive;

use super::MinimalAtomic;
use crate::concurrency::atomic::word::Integral;
use crate::ordering::MemoryOrder;

/// A word `S` living inside the larger word of backend `B`.
pub struct SubWord<B, S> {
    base: B,
    shift: usize,
    _word: PhantomData<S>,
}

impl<B, S> SubWord<B, S>
where
    B: MinimalAtomic,
    B::Word: Integral + AsPrimitive<S>,
    S: Integral + AsPrimitive<B::Word>,
{
    /// Creates a cell at byte `offset` of a fresh embedding word whose other
    /// bytes are zero.
    ///
    /// # Panics
    /// Panics if `S` does not fit in the embedding word at `offset`.
    pub fn with_offset(offset: usize, value: S) -> Self {
        let shift = Self::shift_for(offset);
        let word: B::Word = value.as_() << shift;
        Self {
            base: B::new(word),
            shift,
            _word: PhantomData,
        }
    }

    /// Adopts an existing embedding word and addresses the `S` at byte
    /// `offset` of it.
    ///
    /// # Panics
    /// Panics if `S` does not fit in the embedding word at `offset`.
    pub fn from_base(base: B, offset: usize) -> Self {
        Self {
            base,
            shift: Self::shift_for(offset),
            _word: PhantomData,
        }
    }

    /// The embedding word.
    #[inline]
    pub fn base(&self) -> &B {
        &self.base
    }

    fn shift_for(offset: usize) -> usize {
        assert!(
            offset + S::BYTES <= <B::Word as Integral>::BYTES,
            "a {}-byte word does not fit at offset {offset} of a {}-byte word",
            S::BYTES,
            <B::Word as Integral>::BYTES
        );
        let bytes = if cfg!(target_endian = "little") {
            offset
        } else {
            <B::Word as Integral>::BYTES - S::BYTES - offset
        };
        bytes * 8
    }

    #[inline(always)]
    fn mask(&self) -> B::Word {
        S::max_value().as_() << self.shift
    }

    #[inline(always)]
    fn extract(&self, word: B::Word) -> S {
        (word >> self.shift).as_()
    }

    #[inline(always)]
    fn insert(&self, word: B::Word, value: S) -> B::Word {
        (word & !self.mask()) | (value.as_() << self.shift)
    }
}

impl<B, S> MinimalAtomic for SubWord<B, S>
where
    B: MinimalAtomic,
    B::Word: Integral + AsPrimitive<S>,
    S: Integral + AsPrimitive<B::Word>,
{
    type Word = S;

    fn new(value: S) -> Self {
        Self::with_offset(0, value)
    }

    #[inline]
    fn load(&self, order: MemoryOrder) -> S {
        self.extract(self.base.load(order))
    }

    fn store(&self, value: S, order: MemoryOrder) {
        let mut current = self.base.load(MemoryOrder::Relaxed);
        loop {
            let new = self.insert(current, value);
            if self
                .base
                .compare_exchange_weak(&mut current, new, order, MemoryOrder::Relaxed)
            {
                return;
            }
        }
    }

    fn compare_exchange_weak(
        &self,
        expected: &mut S,
        desired: S,
        success: MemoryOrder,
        failure: MemoryOrder,
    ) -> bool {
        let current = self.base.load(MemoryOrder::Relaxed);
        let mut expected_word = self.insert(current, *expected);
        let desired_word = self.insert(current, desired);
        if self
            .base
            .compare_exchange_weak(&mut expected_word, desired_word, success, failure)
        {
            return true;
        }
        // A change in a neighbouring byte lands here too and looks spurious
        // to the strong-CAS loop above us.
        *expected = self.extract(expected_word);
        false
    }

    #[inline]
    fn is_lock_free(&self) -> bool {
        self.base.is_lock_free()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::atomic::arch::x86::X86;
    use crate::concurrency::atomic::builder::{ExchangeAtomic, ExchangeFromCas};
    use MemoryOrder::SeqCst;

    #[test]
    fn neighbours_survive_writes() {
        let base = X86::<u32>::new(u32::from_ne_bytes([0x11, 0x22, 0x33, 0x44]));
        let cell = SubWord::<_, u8>::from_base(base, 2);
        assert_eq!(cell.load(SeqCst), 0x33);

        cell.store(0xAB, SeqCst);
        assert_eq!(cell.base().load(SeqCst).to_ne_bytes(), [0x11, 0x22, 0xAB, 0x44]);

        let mut expected = 0xAB;
        assert!(cell.compare_exchange_weak(&mut expected, 0xCD, SeqCst, SeqCst));
        assert_eq!(cell.base().load(SeqCst).to_ne_bytes(), [0x11, 0x22, 0xCD, 0x44]);

        let mut wrong = 0x00;
        let strong = ExchangeFromCas::<SubWord<X86<u32>, u8>>::new(0x5A);
        assert!(!strong.compare_exchange_strong(&mut wrong, 1, SeqCst, SeqCst));
        assert_eq!(wrong, 0x5A);
    }

    #[test]
    fn sixteen_bit_in_sixty_four() {
        let cell = SubWord::<X86<u64>, u16>::with_offset(6, 0xBEEF);
        assert_eq!(cell.load(SeqCst), 0xBEEF);
        let bytes = cell.base().load(SeqCst).to_ne_bytes();
        assert_eq!(&bytes[6..], &0xBEEFu16.to_ne_bytes());
        assert!(bytes[..6].iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn rejects_out_of_range_offset() {
        let _ = SubWord::<X86<u32>, u16>::with_offset(3, 0);
    }
}
