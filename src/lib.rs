//! # `halo-atomic` - Portable Atomics and Lock-Free Containers
//!
//! Atomic operations with a memory order chosen per call, portable across
//! architectures with very different native instructions (or none at all),
//! and the classic lock-free containers built on top of them.
//!
//! ## Layers
//!
//! 1. **Memory orders** ([`MemoryOrder`], [`CasOrdering`]): six levels with
//!    their legality rules, checked by `debug_assert!` in every operation.
//! 2. **Backends** ([`concurrency::atomic::arch`]): x86 (native everything),
//!    PowerPC and Alpha (LL/SC with explicit barriers), a generic CAS-only
//!    backend, a lock-table fallback, and a double-word CAS.
//!    [`platform`] selects one at compile time; `backend-*` features
//!    override the choice.
//! 3. **Builder** ([`concurrency::atomic::builder`]): zero-cost wrappers
//!    that derive exchange, fetch-add, arithmetic and bitwise operations from
//!    whatever a backend provides, and embed 8/16-bit atomics in a 32-bit
//!    word on machines without narrow atomics.
//! 4. **[`Atomic<T>`]**: one handle for integers, `bool`, raw pointers,
//!    floats, plain-old-data structs ([`atomic_pod!`]) and, through a lock,
//!    anything `Copy` ([`atomic_locked!`]).
//! 5. **Containers** ([`concurrency::lockfree`]): tagged pointers, caching
//!    and static freelists, the Michael & Scott queue, the Treiber stack and
//!    an SPSC ring buffer.
//!
//! ## Example
//!
//! ```rust
//! use halo_atomic::{Atomic, MemoryOrder};
//!
//! let counter = Atomic::new(41u32);
//! assert_eq!(counter.fetch_add(1, MemoryOrder::AcqRel), 41);
//!
//! let mut expected = 42;
//! assert!(counter.compare_exchange_strong(&mut expected, 17, MemoryOrder::SeqCst));
//!
//! let mut stale = 42;
//! assert!(!counter.compare_exchange_strong(&mut stale, 0, MemoryOrder::SeqCst));
//! assert_eq!(stale, 17);
//! ```
//!
//! ## Features
//!
//! - `tracing`: log allocator growth and lock recovery.
//! - `serde`: serialize [`MemoryOrder`] and [`platform::Backend`].
//! - `proptest`: strategies in [`ordering::strategy`].
//! - `loom`: run the native cells under the loom model checker.
//! - `backend-fallback`, `backend-alpha`, `backend-ppc`,
//!   `backend-generic-cas`: force a backend.

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod tracing_helpers;

pub mod concurrency;
pub mod ordering;
pub mod shim;

pub use concurrency::atomic::arch::platform;
pub use concurrency::atomic::{Atomic, AtomicFlag, AtomicInteger, AtomicValue};
pub use concurrency::lockfree::{
    AtomicTaggedPtr, Caching, CachingFreelist, CapacityError, Consumer, DynRingBuffer, FreelistPolicy,
    LockFreeQueue, LockFreeStack, NodePool, Producer, RingBuffer, Static, StaticFreelist, TaggedPtr,
};
pub use concurrency::CachePadded;
pub use ordering::{fence, CasOrdering, MemoryOrder};

// Compile-time layout checks.
const _: () = {
    use core::mem;

    // Builder wrappers and the handle add nothing to the cell.
    assert!(mem::size_of::<Atomic<u32>>() == mem::size_of::<platform::Atomic32>());
    assert!(mem::size_of::<Atomic<usize>>() == mem::size_of::<platform::AtomicAddr>());

    // A tagged pointer is exactly two words.
    assert!(mem::size_of::<Atomic<TaggedPtr<u8>>>() == 2 * mem::size_of::<usize>());

    assert!(mem::align_of::<CachePadded<u8>>() == 128);
};
