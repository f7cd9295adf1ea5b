//! Machine words the backends operate on.
//!
//! Every backend works on unsigned words only. Signed integers, booleans,
//! pointers and plain-old-data types are carried as the bit pattern of an
//! unsigned word of the same size (see `handle`), which is why arithmetic on
//! them wraps exactly like two's complement.

use core::fmt::Debug;
use core::hash::Hash;
use core::sync::atomic::Ordering;

use num_traits::{PrimInt, Unsigned, WrappingAdd, WrappingSub};

use crate::shim::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicU8, AtomicUsize};

/// An unsigned integer usable as the payload of an atomic primitive.
pub trait Integral:
    PrimInt + Unsigned + WrappingAdd + WrappingSub + Hash + Debug + Default + Send + Sync + 'static
{
    /// Size in bytes.
    const BYTES: usize;

    /// Two's-complement negation (`0 - self`, wrapping).
    #[inline(always)]
    fn negate(self) -> Self {
        Self::zero().wrapping_sub(&self)
    }
}

/// A word for which the target has a native atomic cell.
///
/// All operations here are the raw hardware operations; the backends decide
/// which ordering to pass and which fences to put around them.
pub trait NativeWord: Integral {
    /// The native atomic cell holding one word.
    type Cell: Send + Sync;

    /// Creates a cell holding `value`.
    fn cell(value: Self) -> Self::Cell;

    /// Native load.
    fn load(cell: &Self::Cell, order: Ordering) -> Self;

    /// Native store.
    fn store(cell: &Self::Cell, value: Self, order: Ordering);

    /// Native exchange.
    fn swap(cell: &Self::Cell, value: Self, order: Ordering) -> Self;

    /// Native strong compare-exchange.
    ///
    /// # Errors
    /// Returns the observed value if it differs from `current`.
    fn compare_exchange(
        cell: &Self::Cell,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;

    /// Native weak compare-exchange; may fail spuriously.
    ///
    /// # Errors
    /// Returns the observed value on failure.
    fn compare_exchange_weak(
        cell: &Self::Cell,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;

    /// Native wrapping fetch-add.
    fn fetch_add(cell: &Self::Cell, value: Self, order: Ordering) -> Self;
}

macro_rules! impl_integral {
    ($($ty:ty),*) => {$(
        impl Integral for $ty {
            const BYTES: usize = core::mem::size_of::<$ty>();
        }
    )*};
}

impl_integral!(u8, u16, u32, u64, usize);

macro_rules! impl_native_word {
    ($ty:ty, $cell:ty, $width:literal) => {
        #[cfg(target_has_atomic = $width)]
        impl NativeWord for $ty {
            type Cell = $cell;

            #[inline(always)]
            fn cell(value: Self) -> Self::Cell {
                <$cell>::new(value)
            }

            #[inline(always)]
            fn load(cell: &Self::Cell, order: Ordering) -> Self {
                cell.load(order)
            }

            #[inline(always)]
            fn store(cell: &Self::Cell, value: Self, order: Ordering) {
                cell.store(value, order);
            }

            #[inline(always)]
            fn swap(cell: &Self::Cell, value: Self, order: Ordering) -> Self {
                cell.swap(value, order)
            }

            #[inline(always)]
            fn compare_exchange(
                cell: &Self::Cell,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                cell.compare_exchange(current, new, success, failure)
            }

            #[inline(always)]
            fn compare_exchange_weak(
                cell: &Self::Cell,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                cell.compare_exchange_weak(current, new, success, failure)
            }

            #[inline(always)]
            fn fetch_add(cell: &Self::Cell, value: Self, order: Ordering) -> Self {
                cell.fetch_add(value, order)
            }
        }
    };
}

impl_native_word!(u8, AtomicU8, "8");
impl_native_word!(u16, AtomicU16, "16");
impl_native_word!(u32, AtomicU32, "32");
impl_native_word!(u64, AtomicU64, "64");
impl_native_word!(usize, AtomicUsize, "ptr");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_is_twos_complement() {
        assert_eq!(1u8.negate(), 0xFF);
        assert_eq!(0u32.negate(), 0);
        assert_eq!(5u64.negate(), (-5i64) as u64);
        assert_eq!(u16::BYTES, 2);
        assert_eq!(usize::BYTES, core::mem::size_of::<usize>());
    }

    #[test]
    fn native_cells_follow_hardware_semantics() {
        let c = u32::cell(7);
        assert_eq!(u32::fetch_add(&c, u32::MAX, Ordering::Relaxed), 7);
        assert_eq!(u32::load(&c, Ordering::Relaxed), 6);
        assert_eq!(u32::compare_exchange(&c, 1, 2, Ordering::SeqCst, Ordering::SeqCst), Err(6));
        assert_eq!(u32::swap(&c, 9, Ordering::SeqCst), 6);
    }
}
