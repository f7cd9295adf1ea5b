//! Portable atomics with a per-operation memory order.
//!
//! Layers, bottom up:
//!
//! - [`word`]: the unsigned machine words and their native cells.
//! - [`arch`]: one backend per architecture family, each implementing only
//!   what its hardware does well, plus [`arch::platform`] which selects one.
//! - [`builder`]: zero-cost wrappers deriving the full operation set from
//!   whatever a backend provides.
//! - [`Atomic<T>`]: the typed handle, for integers, `bool`, pointers,
//!   floats, plain-old-data structs and (through a lock) anything `Copy`.
//!
//! Important:
//! - Every operation takes its [`MemoryOrder`](crate::MemoryOrder); illegal
//!   orders are caught by `debug_assert!`, not at run time in release builds.
//! - Whether a cell is lock-free depends on the backend and the value type;
//!   ask [`Atomic::is_lock_free`].

pub mod arch;
pub mod bool;
pub mod builder;
pub mod flag;
pub mod handle;
pub mod pod;
pub mod ptr;
pub mod word;

pub use flag::AtomicFlag;
pub use handle::{Atomic, AtomicInteger, AtomicValue, ReprWord};
