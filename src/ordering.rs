//! Memory ordering levels and their legality rules.
//!
//! `MemoryOrder` mirrors the six levels of the C++11 model, including
//! `Consume`, which `core::sync::atomic::Ordering` does not have. Every atomic
//! operation in this crate takes one of these; the backends decide which
//! fences a level turns into.
//!
//! Strength forms a partial order:
//!
//! ```text
//!            SeqCst
//!              |
//!            AcqRel
//!           /      \
//!   Acquire/Consume  Release
//!           \      /
//!            Relaxed
//! ```
//!
//! Passing an order stronger than an operation needs is always legal. Passing
//! an order the operation cannot honour (a `Release` load, an `Acquire`
//! store, a failure order stronger than the success order) is a programming
//! error, caught by `debug_assert!` in the operations themselves.

use core::sync::atomic::Ordering;

/// The memory ordering attached to an atomic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryOrder {
    /// No ordering constraints, only atomicity.
    Relaxed,
    /// Data-dependent acquire. Treated as `Acquire`.
    Consume,
    /// Later accesses may not move before this load.
    Acquire,
    /// Earlier accesses may not move after this store.
    Release,
    /// Both `Acquire` and `Release`; for read-modify-write operations.
    AcqRel,
    /// `AcqRel` plus a single total order over all `SeqCst` operations.
    SeqCst,
}

impl MemoryOrder {
    /// All six levels, weakest first.
    pub const ALL: [MemoryOrder; 6] = [
        MemoryOrder::Relaxed,
        MemoryOrder::Consume,
        MemoryOrder::Acquire,
        MemoryOrder::Release,
        MemoryOrder::AcqRel,
        MemoryOrder::SeqCst,
    ];

    #[inline(always)]
    const fn has_acquire(self) -> bool {
        matches!(
            self,
            MemoryOrder::Consume | MemoryOrder::Acquire | MemoryOrder::AcqRel | MemoryOrder::SeqCst
        )
    }

    #[inline(always)]
    const fn has_release(self) -> bool {
        matches!(self, MemoryOrder::Release | MemoryOrder::AcqRel | MemoryOrder::SeqCst)
    }

    /// Returns `true` if `self` provides every guarantee `other` provides.
    #[inline]
    pub const fn is_at_least(self, other: MemoryOrder) -> bool {
        match other {
            MemoryOrder::Relaxed => true,
            MemoryOrder::Consume | MemoryOrder::Acquire => self.has_acquire(),
            MemoryOrder::Release => self.has_release(),
            MemoryOrder::AcqRel => self.has_acquire() && self.has_release(),
            MemoryOrder::SeqCst => matches!(self, MemoryOrder::SeqCst),
        }
    }

    /// Returns `true` if a load may carry this order.
    #[inline]
    pub const fn is_valid_for_load(self) -> bool {
        !matches!(self, MemoryOrder::Release | MemoryOrder::AcqRel)
    }

    /// Returns `true` if a store may carry this order.
    #[inline]
    pub const fn is_valid_for_store(self) -> bool {
        matches!(self, MemoryOrder::Relaxed | MemoryOrder::Release | MemoryOrder::SeqCst)
    }

    /// Returns `true` if `self` is a legal failure order for a compare-exchange
    /// whose success order is `success`.
    #[inline]
    pub const fn is_valid_failure_for(self, success: MemoryOrder) -> bool {
        self.is_valid_for_load() && success.is_at_least(self)
    }

    /// The strongest failure order that may accompany `success`.
    #[inline]
    pub const fn strongest_failure(success: MemoryOrder) -> MemoryOrder {
        match success {
            MemoryOrder::Relaxed | MemoryOrder::Release => MemoryOrder::Relaxed,
            MemoryOrder::Consume => MemoryOrder::Consume,
            MemoryOrder::Acquire | MemoryOrder::AcqRel => MemoryOrder::Acquire,
            MemoryOrder::SeqCst => MemoryOrder::SeqCst,
        }
    }

    /// Lowers to the standard library ordering. `Consume` becomes `Acquire`.
    #[inline(always)]
    pub const fn to_std(self) -> Ordering {
        match self {
            MemoryOrder::Relaxed => Ordering::Relaxed,
            MemoryOrder::Consume | MemoryOrder::Acquire => Ordering::Acquire,
            MemoryOrder::Release => Ordering::Release,
            MemoryOrder::AcqRel => Ordering::AcqRel,
            MemoryOrder::SeqCst => Ordering::SeqCst,
        }
    }
}

impl Default for MemoryOrder {
    fn default() -> Self {
        MemoryOrder::SeqCst
    }
}

impl From<Ordering> for MemoryOrder {
    #[inline]
    fn from(order: Ordering) -> Self {
        match order {
            Ordering::Relaxed => MemoryOrder::Relaxed,
            Ordering::Acquire => MemoryOrder::Acquire,
            Ordering::Release => MemoryOrder::Release,
            Ordering::AcqRel => MemoryOrder::AcqRel,
            _ => MemoryOrder::SeqCst,
        }
    }
}

impl From<MemoryOrder> for Ordering {
    #[inline]
    fn from(order: MemoryOrder) -> Self {
        order.to_std()
    }
}

/// Orderings for compare-exchange operations.
///
/// A compare-exchange can be given either one order, applied to the success
/// case with the failure order derived by [`MemoryOrder::strongest_failure`],
/// or an explicit `(success, failure)` pair.
pub trait CasOrdering: Copy {
    /// The ordering of the operation when it succeeds.
    fn success(self) -> MemoryOrder;

    /// The ordering of the operation when it fails.
    ///
    /// Must not be `Release` or `AcqRel` and must not be stronger than the
    /// success ordering.
    fn failure(self) -> MemoryOrder;
}

impl CasOrdering for MemoryOrder {
    #[inline(always)]
    fn success(self) -> MemoryOrder {
        self
    }

    #[inline(always)]
    fn failure(self) -> MemoryOrder {
        MemoryOrder::strongest_failure(self)
    }
}

impl CasOrdering for (MemoryOrder, MemoryOrder) {
    #[inline(always)]
    fn success(self) -> MemoryOrder {
        self.0
    }

    #[inline(always)]
    fn failure(self) -> MemoryOrder {
        self.1
    }
}

impl CasOrdering for Ordering {
    #[inline(always)]
    fn success(self) -> MemoryOrder {
        self.into()
    }

    #[inline(always)]
    fn failure(self) -> MemoryOrder {
        MemoryOrder::strongest_failure(self.into())
    }
}

impl CasOrdering for (Ordering, Ordering) {
    #[inline(always)]
    fn success(self) -> MemoryOrder {
        self.0.into()
    }

    #[inline(always)]
    fn failure(self) -> MemoryOrder {
        self.1.into()
    }
}

/// A thread fence of the given strength. `Relaxed` emits nothing.
#[inline]
pub fn fence(order: MemoryOrder) {
    if order != MemoryOrder::Relaxed {
        crate::shim::atomic::fence(order.to_std());
    }
}

#[inline(always)]
pub(crate) fn debug_check_load(order: MemoryOrder) {
    debug_assert!(order.is_valid_for_load(), "invalid load ordering: {order:?}");
}

#[inline(always)]
pub(crate) fn debug_check_store(order: MemoryOrder) {
    debug_assert!(order.is_valid_for_store(), "invalid store ordering: {order:?}");
}

#[inline(always)]
pub(crate) fn debug_check_cas(success: MemoryOrder, failure: MemoryOrder) {
    debug_assert!(
        failure.is_valid_failure_for(success),
        "failure ordering {failure:?} is invalid for success ordering {success:?}"
    );
}

/// `proptest` strategies over legal orders.
#[cfg(feature = "proptest")]
pub mod strategy {
    use super::MemoryOrder;
    use proptest::prelude::*;

    /// Any of the six orders.
    pub fn any_order() -> impl Strategy<Value = MemoryOrder> {
        proptest::sample::select(MemoryOrder::ALL.to_vec())
    }

    /// Orders legal for a load.
    pub fn load_order() -> impl Strategy<Value = MemoryOrder> {
        any_order().prop_filter("not a load order", |o| o.is_valid_for_load())
    }

    /// Orders legal for a store.
    pub fn store_order() -> impl Strategy<Value = MemoryOrder> {
        any_order().prop_filter("not a store order", |o| o.is_valid_for_store())
    }

    /// A legal `(success, failure)` pair.
    pub fn cas_orders() -> impl Strategy<Value = (MemoryOrder, MemoryOrder)> {
        (any_order(), load_order()).prop_filter("failure stronger than success", |(s, f)| f.is_valid_failure_for(*s))
    }
}
