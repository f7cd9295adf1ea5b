//! Switches the native atomic cells between `core` and `loom`.
//!
//! Every backend reaches the hardware through `word::NativeWord`, which in
//! turn uses the types re-exported here, so building with `--features loom`
//! puts the whole builder stack under the loom model checker.

/// Native atomic cells.
#[cfg(not(feature = "loom"))]
pub mod atomic {
    pub use core::sync::atomic::{fence, AtomicU16, AtomicU32, AtomicU64, AtomicU8, AtomicUsize};
}

/// Native atomic cells, model-checked.
#[cfg(feature = "loom")]
pub mod atomic {
    pub use loom::sync::atomic::{fence, AtomicU16, AtomicU32, AtomicU64, AtomicU8, AtomicUsize};
}
