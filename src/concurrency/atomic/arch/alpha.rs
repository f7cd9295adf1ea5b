//! DEC Alpha.
//!
//! Same `ldl_l`/`stl_c` structure as PowerPC, but Alpha has only one
//! barrier, `mb`, and it reorders even dependent loads, so `Consume` needs a
//! barrier too.

use super::{Barriers, LlSc};
use crate::concurrency::atomic::builder::{ExchangeFromCas, FromLarger, FromTypical};
use crate::ordering::{fence, MemoryOrder};

/// Alpha fence table. Every fence is a full `mb`.
pub struct AlphaBarriers;

impl Barriers for AlphaBarriers {
    #[inline(always)]
    fn before(order: MemoryOrder) {
        match order {
            MemoryOrder::Consume
            | MemoryOrder::Release
            | MemoryOrder::AcqRel
            | MemoryOrder::SeqCst => fence(MemoryOrder::SeqCst),
            _ => {}
        }
    }

    #[inline(always)]
    fn after(order: MemoryOrder) {
        match order {
            MemoryOrder::Consume
            | MemoryOrder::Acquire
            | MemoryOrder::AcqRel
            | MemoryOrder::SeqCst => fence(MemoryOrder::SeqCst),
            _ => {}
        }
    }
}

/// A native Alpha word.
pub type Alpha<W> = LlSc<W, AlphaBarriers>;

/// A full integral atomic on a native word.
pub type Integer<W> = FromTypical<ExchangeFromCas<Alpha<W>>>;

/// A full integral atomic on a 1- or 2-byte word.
pub type Embedded<S> = FromLarger<Alpha<u32>, S>;
