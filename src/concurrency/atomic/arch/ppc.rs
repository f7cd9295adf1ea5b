//! PowerPC.
//!
//! Only 4- and 8-byte words (the latter on 64-bit parts) have
//! `lwarx`/`stwcx.`. Release-class orders put a barrier before the operation,
//! acquire-class orders one after it, and `SeqCst` a full `sync` on both
//! sides. Smaller words are embedded in a 4-byte word.

use super::{Barriers, LlSc};
use crate::concurrency::atomic::builder::{ExchangeFromCas, FromLarger, FromTypical};
use crate::ordering::{fence, MemoryOrder};

/// PowerPC fence table.
pub struct PpcBarriers;

impl Barriers for PpcBarriers {
    #[inline(always)]
    fn before(order: MemoryOrder) {
        match order {
            MemoryOrder::Release | MemoryOrder::AcqRel => fence(MemoryOrder::Release),
            MemoryOrder::SeqCst => fence(MemoryOrder::SeqCst),
            _ => {}
        }
    }

    #[inline(always)]
    fn after(order: MemoryOrder) {
        match order {
            MemoryOrder::Consume | MemoryOrder::Acquire | MemoryOrder::AcqRel => {
                fence(MemoryOrder::Acquire);
            }
            MemoryOrder::SeqCst => fence(MemoryOrder::SeqCst),
            _ => {}
        }
    }
}

/// A native PowerPC word.
pub type Ppc<W> = LlSc<W, PpcBarriers>;

/// A full integral atomic on a native word.
pub type Integer<W> = FromTypical<ExchangeFromCas<Ppc<W>>>;

/// A full integral atomic on a 1- or 2-byte word.
pub type Embedded<S> = FromLarger<Ppc<u32>, S>;
