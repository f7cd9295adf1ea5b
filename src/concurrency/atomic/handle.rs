//! `Atomic<T>`: the typed front end.
//!
//! A value type picks its representation through [`AtomicValue`]: integers,
//! `bool`, pointers and floats are carried as the bits of a platform word,
//! plain-old-data structs go through [`atomic_pod!`](crate::atomic_pod), and
//! anything else can opt into the lock table with
//! [`atomic_locked!`](crate::atomic_locked). All orderings are checked for
//! legality with `debug_assert!`.

use core::fmt;
use core::marker::PhantomData;

use super::arch::platform::{Atomic16, Atomic32, Atomic64, Atomic8, AtomicAddr};
use super::builder::{
    ArithmeticAtomic, ExchangeAtomic, FetchAddAtomic, IntegralAtomic, LogicAtomic, MinimalAtomic,
};
use crate::ordering::{
    debug_check_cas, debug_check_load, debug_check_store, CasOrdering, MemoryOrder,
};

/// The word a value type is stored as.
pub type ReprWord<T> = <<T as AtomicValue>::Repr as MinimalAtomic>::Word;

/// A type that can live in an [`Atomic`].
///
/// # Safety
/// Values are copied between threads through the representation, so the
/// type must be safe to send to another thread, and `from_repr` must accept
/// every word `into_repr` produces.
pub unsafe trait AtomicValue: Copy {
    /// The backend cell holding the value's bits.
    type Repr: ExchangeAtomic;

    /// The bits of `self`.
    fn into_repr(self) -> ReprWord<Self>;

    /// The value whose bits are `word`.
    fn from_repr(word: ReprWord<Self>) -> Self;
}

/// Value types with arithmetic and bitwise operations.
pub trait AtomicInteger: AtomicValue {}

/// An atomic cell holding a `T`.
#[repr(transparent)]
pub struct Atomic<T: AtomicValue> {
    repr: T::Repr,
    _marker: PhantomData<T>,
}

// SAFETY: `AtomicValue` requires that values may cross threads; the
// representation is `Send + Sync` by `MinimalAtomic`.
unsafe impl<T: AtomicValue> Send for Atomic<T> {}
unsafe impl<T: AtomicValue> Sync for Atomic<T> {}

impl<T: AtomicValue> Atomic<T> {
    /// Creates a new atomic holding `value`.
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            repr: <T::Repr as MinimalAtomic>::new(value.into_repr()),
            _marker: PhantomData,
        }
    }

    /// Loads the current value.
    #[inline(always)]
    pub fn load(&self, order: impl Into<MemoryOrder>) -> T {
        let order = order.into();
        debug_check_load(order);
        T::from_repr(self.repr.load(order))
    }

    /// Stores a new value.
    #[inline(always)]
    pub fn store(&self, value: T, order: impl Into<MemoryOrder>) {
        let order = order.into();
        debug_check_store(order);
        self.repr.store(value.into_repr(), order);
    }

    /// Stores `value`, returning the previous value.
    #[inline(always)]
    pub fn exchange(&self, value: T, order: impl Into<MemoryOrder>) -> T {
        T::from_repr(self.repr.exchange(value.into_repr(), order.into()))
    }

    /// Alias of [`exchange`](Self::exchange).
    #[inline(always)]
    pub fn swap(&self, value: T, order: impl Into<MemoryOrder>) -> T {
        self.exchange(value, order)
    }

    /// Stores `desired` if the value equals `*expected`; may fail spuriously.
    ///
    /// On failure the observed value is written to `expected`. `order` is a
    /// single order or a `(success, failure)` pair.
    #[inline(always)]
    pub fn compare_exchange_weak(
        &self,
        expected: &mut T,
        desired: T,
        order: impl CasOrdering,
    ) -> bool {
        let (success, failure) = (order.success(), order.failure());
        debug_check_cas(success, failure);
        let mut word = expected.into_repr();
        let ok = self
            .repr
            .compare_exchange_weak(&mut word, desired.into_repr(), success, failure);
        if !ok {
            *expected = T::from_repr(word);
        }
        ok
    }

    /// Stores `desired` if the value equals `*expected`.
    ///
    /// Fails only if the value differed; the observed value is then written
    /// to `expected`.
    #[inline(always)]
    pub fn compare_exchange_strong(
        &self,
        expected: &mut T,
        desired: T,
        order: impl CasOrdering,
    ) -> bool {
        let (success, failure) = (order.success(), order.failure());
        debug_check_cas(success, failure);
        let mut word = expected.into_repr();
        let ok = self
            .repr
            .compare_exchange_strong(&mut word, desired.into_repr(), success, failure);
        if !ok {
            *expected = T::from_repr(word);
        }
        ok
    }

    /// Stores `new` if the value equals `current`, in the style of
    /// `core::sync::atomic`.
    ///
    /// # Errors
    /// Returns the observed value if it differed from `current`.
    #[inline(always)]
    pub fn compare_exchange(
        &self,
        current: T,
        new: T,
        success: impl Into<MemoryOrder>,
        failure: impl Into<MemoryOrder>,
    ) -> Result<T, T> {
        let mut observed = current;
        if self.compare_exchange_strong(&mut observed, new, (success.into(), failure.into())) {
            Ok(current)
        } else {
            Err(observed)
        }
    }

    /// [`compare_exchange`](Self::compare_exchange) with `AcqRel` on success
    /// and `Acquire` on failure.
    ///
    /// # Errors
    /// Returns the observed value if it differed from `current`.
    #[inline(always)]
    pub fn compare_exchange_cas(&self, current: T, new: T) -> Result<T, T> {
        self.compare_exchange(current, new, MemoryOrder::AcqRel, MemoryOrder::Acquire)
    }

    /// Weak variant of [`compare_exchange_cas`](Self::compare_exchange_cas).
    ///
    /// # Errors
    /// Returns the observed value on failure, which may be spurious.
    #[inline(always)]
    pub fn compare_exchange_weak_cas(&self, current: T, new: T) -> Result<T, T> {
        let mut observed = current;
        if self.compare_exchange_weak(
            &mut observed,
            new,
            (MemoryOrder::AcqRel, MemoryOrder::Acquire),
        ) {
            Ok(current)
        } else {
            Err(observed)
        }
    }

    /// Applies `f` until it returns `None` or its result is stored.
    ///
    /// The CAS failure order is `fetch_order`, capped at the strongest
    /// order legal for `set_order`.
    ///
    /// # Errors
    /// Returns the last observed value if `f` returned `None`.
    pub fn fetch_update<F>(
        &self,
        set_order: impl Into<MemoryOrder>,
        fetch_order: impl Into<MemoryOrder>,
        mut f: F,
    ) -> Result<T, T>
    where
        F: FnMut(T) -> Option<T>,
    {
        let (set_order, fetch_order) = (set_order.into(), fetch_order.into());
        let failure = if fetch_order.is_valid_failure_for(set_order) {
            fetch_order
        } else {
            MemoryOrder::strongest_failure(set_order)
        };
        let mut previous = self.load(fetch_order);
        while let Some(next) = f(previous) {
            if self.compare_exchange_weak(&mut previous, next, (set_order, failure)) {
                return Ok(previous);
            }
        }
        Err(previous)
    }

    /// `SeqCst` load.
    #[inline(always)]
    pub fn get(&self) -> T {
        self.load(MemoryOrder::SeqCst)
    }

    /// `SeqCst` store.
    #[inline(always)]
    pub fn set(&self, value: T) {
        self.store(value, MemoryOrder::SeqCst);
    }

    /// Whether operations on this cell never block.
    #[inline(always)]
    pub fn is_lock_free(&self) -> bool {
        self.repr.is_lock_free()
    }

    /// Consumes the atomic, returning the value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.load(MemoryOrder::Relaxed)
    }
}

impl<T> Atomic<T>
where
    T: AtomicInteger,
    T::Repr: IntegralAtomic,
{
    /// Adds `value` (wrapping), returning the previous value.
    #[inline(always)]
    pub fn fetch_add(&self, value: T, order: impl Into<MemoryOrder>) -> T {
        T::from_repr(self.repr.fetch_add(value.into_repr(), order.into()))
    }

    /// Subtracts `value` (wrapping), returning the previous value.
    #[inline(always)]
    pub fn fetch_sub(&self, value: T, order: impl Into<MemoryOrder>) -> T {
        T::from_repr(self.repr.fetch_sub(value.into_repr(), order.into()))
    }

    /// Bitwise AND, returning the previous value.
    #[inline(always)]
    pub fn fetch_and(&self, value: T, order: impl Into<MemoryOrder>) -> T {
        T::from_repr(self.repr.fetch_and(value.into_repr(), order.into()))
    }

    /// Bitwise OR, returning the previous value.
    #[inline(always)]
    pub fn fetch_or(&self, value: T, order: impl Into<MemoryOrder>) -> T {
        T::from_repr(self.repr.fetch_or(value.into_repr(), order.into()))
    }

    /// Bitwise XOR, returning the previous value.
    #[inline(always)]
    pub fn fetch_xor(&self, value: T, order: impl Into<MemoryOrder>) -> T {
        T::from_repr(self.repr.fetch_xor(value.into_repr(), order.into()))
    }

    /// `++x` with `SeqCst`.
    #[inline]
    pub fn pre_increment(&self) -> T {
        T::from_repr(self.repr.pre_increment(MemoryOrder::SeqCst))
    }

    /// `x++` with `SeqCst`.
    #[inline]
    pub fn post_increment(&self) -> T {
        T::from_repr(self.repr.post_increment(MemoryOrder::SeqCst))
    }

    /// `--x` with `SeqCst`.
    #[inline]
    pub fn pre_decrement(&self) -> T {
        T::from_repr(self.repr.pre_decrement(MemoryOrder::SeqCst))
    }

    /// `x--` with `SeqCst`.
    #[inline]
    pub fn post_decrement(&self) -> T {
        T::from_repr(self.repr.post_decrement(MemoryOrder::SeqCst))
    }

    /// `x += value` with `SeqCst`, returning the new value.
    #[inline]
    pub fn add_fetch(&self, value: T) -> T {
        T::from_repr(self.repr.add_fetch(value.into_repr(), MemoryOrder::SeqCst))
    }

    /// `x -= value` with `SeqCst`, returning the new value.
    #[inline]
    pub fn sub_fetch(&self, value: T) -> T {
        T::from_repr(self.repr.sub_fetch(value.into_repr(), MemoryOrder::SeqCst))
    }

    /// `x &= value` with `SeqCst`, returning the new value.
    #[inline]
    pub fn and_fetch(&self, value: T) -> T {
        T::from_repr(self.repr.and_fetch(value.into_repr(), MemoryOrder::SeqCst))
    }

    /// `x |= value` with `SeqCst`, returning the new value.
    #[inline]
    pub fn or_fetch(&self, value: T) -> T {
        T::from_repr(self.repr.or_fetch(value.into_repr(), MemoryOrder::SeqCst))
    }

    /// `x ^= value` with `SeqCst`, returning the new value.
    #[inline]
    pub fn xor_fetch(&self, value: T) -> T {
        T::from_repr(self.repr.xor_fetch(value.into_repr(), MemoryOrder::SeqCst))
    }
}

impl<T: AtomicValue + Default> Default for Atomic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: AtomicValue> From<T> for Atomic<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: AtomicValue + fmt::Debug> fmt::Debug for Atomic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Atomic")
            .field(&self.load(MemoryOrder::Relaxed))
            .finish()
    }
}

macro_rules! impl_integer {
    ($($ty:ty => $word:ty, $repr:ty;)*) => {$(
        // SAFETY: integers are `Send` and every bit pattern is valid.
        unsafe impl AtomicValue for $ty {
            type Repr = $repr;

            #[inline(always)]
            #[allow(clippy::cast_sign_loss, clippy::unnecessary_cast)]
            fn into_repr(self) -> $word {
                self as $word
            }

            #[inline(always)]
            #[allow(clippy::cast_possible_wrap, clippy::unnecessary_cast)]
            fn from_repr(word: $word) -> Self {
                word as $ty
            }
        }

        impl AtomicInteger for $ty {}
    )*};
}

impl_integer! {
    u8 => u8, Atomic8;
    i8 => u8, Atomic8;
    u16 => u16, Atomic16;
    i16 => u16, Atomic16;
    u32 => u32, Atomic32;
    i32 => u32, Atomic32;
    u64 => u64, Atomic64;
    i64 => u64, Atomic64;
    usize => usize, AtomicAddr;
    isize => usize, AtomicAddr;
}

#[doc(hidden)]
pub fn assert_send<T: Send>() {}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::Ordering;

    #[test]
    fn signed_wraps_as_twos_complement() {
        let a = Atomic::new(i8::MAX);
        assert_eq!(a.fetch_add(1, Ordering::SeqCst), i8::MAX);
        assert_eq!(a.load(Ordering::SeqCst), i8::MIN);
        assert_eq!(a.fetch_sub(1, MemoryOrder::AcqRel), i8::MIN);
        assert_eq!(a.get(), i8::MAX);
        assert_eq!(a.sub_fetch(-1), i8::MIN);
    }

    #[test]
    fn std_style_compare_exchange() {
        let a = Atomic::new(10u16);
        assert_eq!(a.compare_exchange(10, 11, Ordering::AcqRel, Ordering::Acquire), Ok(10));
        assert_eq!(a.compare_exchange(10, 12, Ordering::AcqRel, Ordering::Relaxed), Err(11));
        assert_eq!(a.compare_exchange_cas(11, 12), Ok(11));
        let mut current = a.load(Ordering::Relaxed);
        loop {
            match a.compare_exchange_weak_cas(current, current * 2) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        assert_eq!(a.into_inner(), 24);
    }

    #[test]
    fn fetch_update_stops_on_none() {
        let a = Atomic::new(3usize);
        assert_eq!(a.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |x| x.checked_sub(1)), Ok(3));
        assert_eq!(a.fetch_update(MemoryOrder::SeqCst, MemoryOrder::SeqCst, |_| None), Err(2));
        assert_eq!(a.get(), 2);
    }

    #[test]
    fn default_and_debug() {
        let a: Atomic<i64> = Atomic::default();
        assert_eq!(a.get(), 0);
        a.set(-4);
        assert_eq!(format!("{a:?}"), "Atomic(-4)");
        assert_eq!(Atomic::from(7u32).get(), 7);
    }

    #[test]
    fn operator_forms() {
        let a = Atomic::new(0b1100i32);
        assert_eq!(a.post_increment(), 0b1100);
        assert_eq!(a.pre_increment(), 0b1110);
        assert_eq!(a.post_decrement(), 0b1110);
        assert_eq!(a.pre_decrement(), 0b1100);
        assert_eq!(a.add_fetch(3), 0b1111);
        assert_eq!(a.and_fetch(0b0101), 0b0101);
        assert_eq!(a.or_fetch(0b1000), 0b1101);
        assert_eq!(a.xor_fetch(0b1111), 0b0010);
        assert_eq!(a.fetch_xor(0b0010, Ordering::Relaxed), 0b0010);
        assert_eq!(a.fetch_or(-1, Ordering::Relaxed), 0);
        assert_eq!(a.fetch_and(0, Ordering::Relaxed), -1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid load ordering")]
    fn release_load_is_rejected() {
        let a = Atomic::new(1u8);
        let _ = a.load(MemoryOrder::Release);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "failure ordering")]
    fn failure_stronger_than_success_is_rejected() {
        let a = Atomic::new(1u8);
        let mut expected = 1;
        a.compare_exchange_strong(&mut expected, 2, (MemoryOrder::Relaxed, MemoryOrder::SeqCst));
    }
}
