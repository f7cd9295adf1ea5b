//! Atomics and the lock-free containers built from them.
//!
//! Important: the containers recycle their nodes instead of freeing them, so
//! memory held by a queue or stack only shrinks when the container drops.

pub mod atomic;
pub mod cache_padded;
pub mod lockfree;

pub use cache_padded::CachePadded;
