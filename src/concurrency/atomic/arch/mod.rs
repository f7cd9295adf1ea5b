//! Architecture backends.
//!
//! Each backend provides the smallest set of operations its hardware does
//! natively and implements [`MinimalAtomic`] plus whatever richer builder
//! traits it can do better than a CAS loop. The builder layers in
//! [`super::builder`] derive the rest.
//!
//! Every backend is compiled on every target so that each one can be tested
//! on any host; [`platform`] picks the one the rest of the crate uses.

pub mod alpha;
pub mod dcas;
pub mod fallback;
pub mod generic_cas;
mod llsc;
pub mod platform;
pub mod ppc;
pub mod x86;

pub use llsc::{Barriers, LlSc};

use crate::ordering::MemoryOrder;

/// The operations every backend must provide for a word type.
///
/// This is the capability boundary between architecture-specific code and
/// the architecture-agnostic builder. Orders are taken as given; checking
/// their legality is the caller's job.
pub trait MinimalAtomic: Send + Sync {
    /// The value held by the cell.
    type Word: Copy + PartialEq;

    /// Creates a cell holding `value`.
    fn new(value: Self::Word) -> Self
    where
        Self: Sized;

    /// Atomically reads the cell.
    fn load(&self, order: MemoryOrder) -> Self::Word;

    /// Atomically writes the cell.
    fn store(&self, value: Self::Word, order: MemoryOrder);

    /// Replaces the value with `desired` if it equals `*expected`.
    ///
    /// Returns `true` on success. On failure, which may be spurious, the
    /// observed value is written back into `expected`.
    fn compare_exchange_weak(
        &self,
        expected: &mut Self::Word,
        desired: Self::Word,
        success: MemoryOrder,
        failure: MemoryOrder,
    ) -> bool;

    /// Whether operations on this cell never block.
    fn is_lock_free(&self) -> bool;
}
