//! Floats and plain-old-data types carried as the bytes of a word.
//!
//! A struct of size 1, 2, 4 or 8 with no padding can be made atomic by
//! deriving `zerocopy::AsBytes` and `zerocopy::FromBytes` and invoking
//! [`atomic_pod!`](crate::atomic_pod). The value is copied byte for byte into
//! the word; no pointer casts are involved. Comparison in compare-exchange
//! is bitwise.

use zerocopy::{AsBytes, FromBytes};

use super::arch::platform::{Atomic32, Atomic64};
use super::handle::AtomicValue;

// SAFETY: floats are `Send` and every bit pattern is a float.
unsafe impl AtomicValue for f32 {
    type Repr = Atomic32;

    #[inline(always)]
    fn into_repr(self) -> u32 {
        self.to_bits()
    }

    #[inline(always)]
    fn from_repr(word: u32) -> Self {
        f32::from_bits(word)
    }
}

// SAFETY: as for `f32`.
unsafe impl AtomicValue for f64 {
    type Repr = Atomic64;

    #[inline(always)]
    fn into_repr(self) -> u64 {
        self.to_bits()
    }

    #[inline(always)]
    fn from_repr(word: u64) -> Self {
        f64::from_bits(word)
    }
}

/// Copies the bytes of `value` into a word of the same size.
#[doc(hidden)]
#[inline(always)]
pub fn to_word<T: AsBytes, W: AsBytes + FromBytes>(value: T) -> W {
    let mut word = W::new_zeroed();
    word.as_bytes_mut().copy_from_slice(value.as_bytes());
    word
}

/// Copies the bytes of `word` into a value of the same size.
#[doc(hidden)]
#[inline(always)]
pub fn from_word<T: AsBytes + FromBytes, W: AsBytes>(word: W) -> T {
    let mut value = T::new_zeroed();
    value.as_bytes_mut().copy_from_slice(word.as_bytes());
    value
}

/// Implements [`AtomicValue`] for a padding-free `Copy` type by copying its
/// bytes into an unsigned word of the same size.
///
/// ```
/// use halo_atomic::{atomic_pod, Atomic, MemoryOrder};
/// use zerocopy::{AsBytes, FromBytes, FromZeroes};
///
/// #[derive(Clone, Copy, Debug, PartialEq, AsBytes, FromBytes, FromZeroes)]
/// #[repr(C)]
/// struct Span {
///     start: u16,
///     len: u16,
/// }
///
/// atomic_pod!(Span => u32);
///
/// let a = Atomic::new(Span { start: 1, len: 2 });
/// a.store(Span { start: 3, len: 4 }, MemoryOrder::Release);
/// assert_eq!(a.load(MemoryOrder::Acquire), Span { start: 3, len: 4 });
/// ```
///
/// Mismatched sizes do not compile.
#[macro_export]
macro_rules! atomic_pod {
    ($ty:ty => $word:ty) => {
        const _: () = assert!(
            ::core::mem::size_of::<$ty>() == ::core::mem::size_of::<$word>(),
            "atomic_pod!: the type and the word differ in size"
        );

        // SAFETY: `FromBytes` makes every word a valid value, and the value is
        // only ever copied, never referenced across threads.
        unsafe impl $crate::concurrency::atomic::AtomicValue for $ty {
            type Repr = <$word as $crate::concurrency::atomic::AtomicValue>::Repr;

            #[inline(always)]
            fn into_repr(self) -> $word {
                $crate::concurrency::atomic::pod::to_word(self)
            }

            #[inline(always)]
            fn from_repr(word: $word) -> Self {
                $crate::concurrency::atomic::pod::from_word(word)
            }
        }
    };
}

/// Implements [`AtomicValue`] for any `Copy + PartialEq + Send` type through
/// the mutex table of the fallback backend.
///
/// ```
/// use halo_atomic::{atomic_locked, Atomic, MemoryOrder};
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// struct Wide([u64; 3]);
///
/// atomic_locked!(Wide);
///
/// let a = Atomic::new(Wide([1, 2, 3]));
/// assert!(!a.is_lock_free());
/// assert_eq!(a.exchange(Wide([0; 3]), MemoryOrder::SeqCst), Wide([1, 2, 3]));
/// ```
#[macro_export]
macro_rules! atomic_locked {
    ($ty:ty) => {
        const _: fn() = $crate::concurrency::atomic::handle::assert_send::<$ty>;

        // SAFETY: `$ty` is `Send`, checked above.
        unsafe impl $crate::concurrency::atomic::AtomicValue for $ty {
            type Repr = $crate::concurrency::atomic::arch::fallback::Locked<$ty>;

            #[inline(always)]
            fn into_repr(self) -> Self {
                self
            }

            #[inline(always)]
            fn from_repr(word: Self) -> Self {
                word
            }
        }
    };
}
