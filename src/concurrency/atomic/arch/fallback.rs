//! Lock-based atomics for targets and types without hardware support.
//!
//! Cells are guarded by a process-wide table of mutexes indexed by a hash of
//! the cell's address. Distinct cells can share a lock, which costs
//! contention but never correctness. `SeqCst` operations additionally take
//! one global lock first, which puts all of them in a single total order
//! across addresses.
//!
//! The table is built at compile time and lives for the whole process.
//! A lock poisoned by a panicking holder is recovered: the guarded value is
//! a `Copy` word that cannot be left half-written.

use std::cell::UnsafeCell;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::MinimalAtomic;
use crate::concurrency::atomic::builder::{ExchangeAtomic, FetchAddAtomic, FromAdd};
use crate::concurrency::atomic::word::Integral as IntegralWord;
use crate::ordering::MemoryOrder;
use crate::tracing_helpers::warn_log;

/// Number of address-hashed locks.
pub const LOCK_COUNT: usize = 16;

static SEQ_CST_LOCK: Mutex<()> = Mutex::new(());
static LOCKS: [Mutex<()>; LOCK_COUNT] = [const { Mutex::new(()) }; LOCK_COUNT];

/// The lock slot guarding address `addr`.
#[inline]
pub fn lock_index(addr: usize) -> usize {
    let mut v = addr;
    v ^= v >> 16;
    v ^= v >> 8;
    v ^= v >> 4;
    v % LOCK_COUNT
}

fn acquire(lock: &'static Mutex<()>) -> MutexGuard<'static, ()> {
    lock.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        warn_log!("recovered a poisoned atomic fallback lock");
        poisoned.into_inner()
    })
}

/// Holds the locks for one operation. Fields drop in declaration order, so
/// the address lock is released before the global one.
struct OpGuard {
    _local: MutexGuard<'static, ()>,
    _global: Option<MutexGuard<'static, ()>>,
}

impl OpGuard {
    #[inline]
    fn new(addr: usize, order: MemoryOrder) -> Self {
        let global = (order == MemoryOrder::SeqCst).then(|| acquire(&SEQ_CST_LOCK));
        let local = acquire(&LOCKS[lock_index(addr)]);
        Self {
            _local: local,
            _global: global,
        }
    }
}

/// Any `Copy` value made atomic by the lock table.
pub struct Locked<T> {
    value: UnsafeCell<T>,
}

// SAFETY: every access to `value` happens under the lock for its address.
unsafe impl<T: Send> Sync for Locked<T> {}

impl<T> Locked<T> {
    #[inline]
    fn guard(&self, order: MemoryOrder) -> OpGuard {
        OpGuard::new(self.value.get() as usize, order)
    }

    /// Consumes the cell, returning the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Copy + PartialEq + Send> MinimalAtomic for Locked<T> {
    type Word = T;

    #[inline]
    fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    fn load(&self, order: MemoryOrder) -> T {
        let _guard = self.guard(order);
        // SAFETY: the address lock is held.
        unsafe { *self.value.get() }
    }

    fn store(&self, value: T, order: MemoryOrder) {
        let _guard = self.guard(order);
        // SAFETY: the address lock is held.
        unsafe { *self.value.get() = value }
    }

    #[inline]
    fn compare_exchange_weak(
        &self,
        expected: &mut T,
        desired: T,
        success: MemoryOrder,
        failure: MemoryOrder,
    ) -> bool {
        self.compare_exchange_strong(expected, desired, success, failure)
    }

    #[inline(always)]
    fn is_lock_free(&self) -> bool {
        false
    }
}

impl<T: Copy + PartialEq + Send> ExchangeAtomic for Locked<T> {
    fn compare_exchange_strong(
        &self,
        expected: &mut T,
        desired: T,
        success: MemoryOrder,
        _failure: MemoryOrder,
    ) -> bool {
        let _guard = self.guard(success);
        // SAFETY: the address lock is held.
        let slot = unsafe { &mut *self.value.get() };
        if *slot == *expected {
            *slot = desired;
            true
        } else {
            *expected = *slot;
            false
        }
    }

    fn exchange(&self, value: T, order: MemoryOrder) -> T {
        let _guard = self.guard(order);
        // SAFETY: the address lock is held.
        unsafe { core::mem::replace(&mut *self.value.get(), value) }
    }
}

impl<W: IntegralWord> FetchAddAtomic for Locked<W> {
    fn fetch_add(&self, value: W, order: MemoryOrder) -> W {
        let _guard = self.guard(order);
        // SAFETY: the address lock is held.
        let slot = unsafe { &mut *self.value.get() };
        let previous = *slot;
        *slot = previous.wrapping_add(&value);
        previous
    }
}

/// A full integral atomic on `W`, behind the lock table.
pub type Integer<W> = FromAdd<Locked<W>>;
