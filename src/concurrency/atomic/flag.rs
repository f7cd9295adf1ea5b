//! The one atomic every platform must support.

use core::fmt;

use super::handle::Atomic;
use crate::ordering::MemoryOrder;

/// A boolean flag with test-and-set and clear.
pub struct AtomicFlag {
    state: Atomic<u32>,
}

impl AtomicFlag {
    /// Creates a flag, set or clear.
    #[inline]
    pub fn new(set: bool) -> Self {
        Self {
            state: Atomic::new(u32::from(set)),
        }
    }

    /// Sets the flag, returning whether it was already set.
    #[inline]
    pub fn test_and_set(&self, order: impl Into<MemoryOrder>) -> bool {
        self.state.exchange(1, order) != 0
    }

    /// Clears the flag.
    #[inline]
    pub fn clear(&self, order: impl Into<MemoryOrder>) {
        self.state.store(0, order);
    }

    /// Whether the flag never blocks.
    #[inline]
    pub fn is_lock_free(&self) -> bool {
        self.state.is_lock_free()
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for AtomicFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicFlag")
            .field("set", &(self.state.load(MemoryOrder::Relaxed) != 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_and_set_reports_previous() {
        let flag = AtomicFlag::default();
        assert!(!flag.test_and_set(MemoryOrder::Acquire));
        assert!(flag.test_and_set(MemoryOrder::Acquire));
        flag.clear(MemoryOrder::Release);
        assert!(!flag.test_and_set(MemoryOrder::SeqCst));
        assert!(AtomicFlag::new(true).test_and_set(MemoryOrder::Relaxed));
    }

    #[test]
    fn spinlock_excludes() {
        let flag = Arc::new(AtomicFlag::new(false));
        let counter = Arc::new(Atomic::new(0u64));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let flag = Arc::clone(&flag);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..500 {
                        while flag.test_and_set(MemoryOrder::Acquire) {
                            std::hint::spin_loop();
                        }
                        // Non-atomic read-modify-write, protected by the flag.
                        let v = counter.load(MemoryOrder::Relaxed);
                        counter.store(v + 1, MemoryOrder::Relaxed);
                        flag.clear(MemoryOrder::Release);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.get(), 2000);
    }
}
