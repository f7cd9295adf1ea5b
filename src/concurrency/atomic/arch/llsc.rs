//! Load-linked / store-conditional machines.
//!
//! The hardware operation itself is always relaxed: a `lwarx`/`stwcx.` pair
//! or its equivalent, modelled here as a relaxed native operation. Ordering
//! comes entirely from the fences a [`Barriers`] table puts around it. Only
//! the weak CAS is native; a store-conditional may fail without the value
//! having changed.

use core::marker::PhantomData;
use core::sync::atomic::Ordering::Relaxed;

use super::MinimalAtomic;
use crate::concurrency::atomic::builder::FetchIncDec;
use crate::concurrency::atomic::word::NativeWord;
use crate::ordering::{fence, MemoryOrder};

/// The fences an architecture emits around a relaxed hardware operation.
pub trait Barriers: Send + Sync + 'static {
    /// Fence emitted before an operation carrying `order`.
    fn before(order: MemoryOrder);

    /// Fence emitted after an operation carrying `order`.
    fn after(order: MemoryOrder);
}

/// A word on an LL/SC machine whose fences are described by `F`.
#[repr(transparent)]
pub struct LlSc<W: NativeWord, F> {
    cell: W::Cell,
    _barriers: PhantomData<F>,
}

impl<W: NativeWord, F: Barriers> MinimalAtomic for LlSc<W, F> {
    type Word = W;

    #[inline(always)]
    fn new(value: W) -> Self {
        Self {
            cell: W::cell(value),
            _barriers: PhantomData,
        }
    }

    #[inline(always)]
    fn load(&self, order: MemoryOrder) -> W {
        // SeqCst loads are fenced on both sides so a preceding SeqCst store
        // cannot pass them.
        if order == MemoryOrder::SeqCst {
            fence(MemoryOrder::SeqCst);
        }
        let value = W::load(&self.cell, Relaxed);
        F::after(order);
        value
    }

    #[inline(always)]
    fn store(&self, value: W, order: MemoryOrder) {
        F::before(order);
        W::store(&self.cell, value, Relaxed);
        if order == MemoryOrder::SeqCst {
            fence(MemoryOrder::SeqCst);
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
        F::before(success);
        match W::compare_exchange_weak(&self.cell, *expected, desired, Relaxed, Relaxed) {
            Ok(_) => {
                F::after(success);
                true
            }
            Err(observed) => {
                F::after(failure);
                *expected = observed;
                false
            }
        }
    }

    #[inline(always)]
    fn is_lock_free(&self) -> bool {
        true
    }
}

impl<W: NativeWord, F: Barriers> FetchIncDec for LlSc<W, F> {
    #[inline(always)]
    fn fetch_add_var(&self, value: W, order: MemoryOrder) -> W {
        F::before(order);
        let previous = W::fetch_add(&self.cell, value, Relaxed);
        F::after(order);
        previous
    }

    #[inline(always)]
    fn fetch_inc(&self, order: MemoryOrder) -> W {
        self.fetch_add_var(W::one(), order)
    }

    #[inline(always)]
    fn fetch_dec(&self, order: MemoryOrder) -> W {
        self.fetch_add_var(W::one().negate(), order)
    }
}
