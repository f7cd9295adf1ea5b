//! Double-word compare-and-swap.
//!
//! A pointer and its generation tag are swapped together as one word twice
//! the pointer width (`cmpxchg16b`, `casp`, `lqarx`/`stqcx.`, ...). Targets
//! without such an instruction get `portable-atomic`'s lock-based emulation,
//! which [`Dcas::is_lock_free`](MinimalAtomic::is_lock_free) reports.

use super::MinimalAtomic;
use crate::concurrency::atomic::builder::ExchangeAtomic;
use crate::ordering::MemoryOrder;

#[cfg(target_pointer_width = "64")]
mod imp {
    pub type DoubleWord = u128;
    pub type Cell = portable_atomic::AtomicU128;
}

#[cfg(target_pointer_width = "32")]
mod imp {
    pub type DoubleWord = u64;
    pub type Cell = portable_atomic::AtomicU64;
}

/// Two pointer-sized words as one integer.
pub type DoubleWord = imp::DoubleWord;

const HALF: u32 = usize::BITS;

/// Packs `(low, high)` into one double word.
#[inline(always)]
pub const fn pack(low: usize, high: usize) -> DoubleWord {
    ((high as DoubleWord) << HALF) | low as DoubleWord
}

/// Splits a double word into `(low, high)`.
#[inline(always)]
#[allow(clippy::cast_possible_truncation)]
pub const fn unpack(word: DoubleWord) -> (usize, usize) {
    (word as usize, (word >> HALF) as usize)
}

/// A double-word atomic cell.
#[repr(transparent)]
pub struct Dcas {
    cell: imp::Cell,
}

impl MinimalAtomic for Dcas {
    type Word = DoubleWord;

    #[inline(always)]
    fn new(value: DoubleWord) -> Self {
        Self {
            cell: imp::Cell::new(value),
        }
    }

    #[inline(always)]
    fn load(&self, order: MemoryOrder) -> DoubleWord {
        self.cell.load(order.to_std())
    }

    #[inline(always)]
    fn store(&self, value: DoubleWord, order: MemoryOrder) {
        self.cell.store(value, order.to_std());
    }

    #[inline(always)]
    fn compare_exchange_weak(
        &self,
        expected: &mut DoubleWord,
        desired: DoubleWord,
        success: MemoryOrder,
        failure: MemoryOrder,
    ) -> bool {
        report(
            self.cell
                .compare_exchange_weak(*expected, desired, success.to_std(), failure.to_std()),
            expected,
        )
    }

    #[inline(always)]
    fn is_lock_free(&self) -> bool {
        imp::Cell::is_lock_free()
    }
}

impl ExchangeAtomic for Dcas {
    #[inline(always)]
    fn compare_exchange_strong(
        &self,
        expected: &mut DoubleWord,
        desired: DoubleWord,
        success: MemoryOrder,
        failure: MemoryOrder,
    ) -> bool {
        report(
            self.cell
                .compare_exchange(*expected, desired, success.to_std(), failure.to_std()),
            expected,
        )
    }

    #[inline(always)]
    fn exchange(&self, value: DoubleWord, order: MemoryOrder) -> DoubleWord {
        self.cell.swap(value, order.to_std())
    }
}

#[inline(always)]
fn report(result: Result<DoubleWord, DoubleWord>, expected: &mut DoubleWord) -> bool {
    match result {
        Ok(_) => true,
        Err(observed) => {
            *expected = observed;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MemoryOrder::SeqCst;

    #[test]
    fn pack_round_trips() {
        let word = pack(0x1234, usize::MAX);
        assert_eq!(unpack(word), (0x1234, usize::MAX));
        assert_eq!(unpack(pack(0, 0)), (0, 0));
    }

    #[test]
    fn both_halves_must_match() {
        let cell = Dcas::new(pack(8, 1));
        let mut expected = pack(8, 0);
        assert!(!cell.compare_exchange_strong(&mut expected, pack(16, 2), SeqCst, SeqCst));
        assert_eq!(unpack(expected), (8, 1));
        assert!(cell.compare_exchange_strong(&mut expected, pack(16, 2), SeqCst, SeqCst));
        assert_eq!(unpack(cell.exchange(pack(0, 3), SeqCst)), (16, 2));
        assert_eq!(unpack(cell.load(SeqCst)), (0, 3));
    }
}
