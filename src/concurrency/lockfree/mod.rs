//! Lock-free containers built on [`Atomic`](crate::Atomic).
//!
//! All of them recycle nodes through a [`freelist`] and defeat ABA with
//! [`TaggedPtr`]s swapped by double-word CAS. Nodes are never returned to
//! the operating system while their container is alive, so a thread holding
//! a stale pointer can always dereference it; the tag makes its CAS fail.

pub mod freelist;
pub mod queue;
pub mod ringbuffer;
pub mod stack;
pub mod tagged_ptr;

pub use freelist::{Caching, CachingFreelist, FreelistPolicy, NodePool, Static, StaticFreelist};
pub use queue::LockFreeQueue;
pub use ringbuffer::{Consumer, DynRingBuffer, Producer, RingBuffer};
pub use stack::LockFreeStack;
pub use tagged_ptr::{AtomicTaggedPtr, TaggedPtr};

use core::fmt;

/// Returned when a bounded container has no room; gives the value back.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CapacityError<T>(pub T);

impl<T> CapacityError<T> {
    /// The value that could not be stored.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for CapacityError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CapacityError(..)")
    }
}

impl<T> fmt::Display for CapacityError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("container is at capacity")
    }
}

impl<T> std::error::Error for CapacityError<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_error_returns_value() {
        let err = CapacityError(String::from("payload"));
        assert_eq!(err.to_string(), "container is at capacity");
        assert_eq!(format!("{err:?}"), "CapacityError(..)");
        assert_eq!(err.into_inner(), "payload");
    }
}
