#![cfg(not(feature = "loom"))]

use core::sync::atomic::Ordering;
use halo_atomic::{atomic_locked, atomic_pod, platform, Atomic, AtomicFlag, MemoryOrder};
use std::sync::Arc;
use std::thread;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn handles_are_send_sync() {
    assert_send_sync::<Atomic<u8>>();
    assert_send_sync::<Atomic<i64>>();
    assert_send_sync::<Atomic<bool>>();
    assert_send_sync::<Atomic<*mut String>>();
    assert_send_sync::<Atomic<f32>>();
    assert_send_sync::<AtomicFlag>();
}

#[test]
fn counter_then_cas_scenario() {
    let a = Atomic::new(41i32);
    assert_eq!(a.fetch_add(1, MemoryOrder::SeqCst), 41);
    assert_eq!(a.load(MemoryOrder::SeqCst), 42);

    let mut expected = 42;
    assert!(a.compare_exchange_strong(&mut expected, 17, MemoryOrder::SeqCst));
    assert_eq!(a.load(MemoryOrder::SeqCst), 17);

    let mut expected = 12;
    assert!(!a.compare_exchange_strong(&mut expected, 19, MemoryOrder::SeqCst));
    assert_eq!(expected, 17);
    assert_eq!(a.load(MemoryOrder::SeqCst), 17);
}

#[test]
fn std_orderings_are_accepted() {
    let a = Atomic::new(5usize);
    a.store(6, Ordering::Release);
    assert_eq!(a.load(Ordering::Acquire), 6);
    assert_eq!(a.swap(1, Ordering::AcqRel), 6);
    assert_eq!(a.compare_exchange(1, 2, Ordering::AcqRel, Ordering::Relaxed), Ok(1));
    assert_eq!(a.compare_exchange(1, 3, Ordering::SeqCst, Ordering::SeqCst), Err(2));
    let mut expected = 2;
    while !a.compare_exchange_weak(&mut expected, 8, (Ordering::AcqRel, Ordering::Acquire)) {}
    assert_eq!(a.into_inner(), 8);
}

#[test]
fn every_width_wraps() {
    let a = Atomic::new(u8::MAX);
    assert_eq!(a.fetch_add(2, MemoryOrder::Relaxed), u8::MAX);
    assert_eq!(a.get(), 1);

    let b = Atomic::new(0u16);
    assert_eq!(b.fetch_sub(1, MemoryOrder::Relaxed), 0);
    assert_eq!(b.get(), u16::MAX);

    let c = Atomic::new(i32::MAX);
    assert_eq!(c.add_fetch(1), i32::MIN);

    let d = Atomic::new(0i64);
    assert_eq!(d.pre_decrement(), -1);
    assert_eq!(d.post_increment(), -1);
    assert_eq!(d.get(), 0);

    let e = Atomic::new(0b1010u64);
    assert_eq!(e.fetch_and(0b0110, MemoryOrder::AcqRel), 0b1010);
    assert_eq!(e.fetch_or(0b1000, MemoryOrder::AcqRel), 0b0010);
    assert_eq!(e.fetch_xor(0b1111, MemoryOrder::AcqRel), 0b1010);
    assert_eq!(e.get(), 0b0101);

    let f = Atomic::new(-1isize);
    assert_eq!(f.sub_fetch(1), -2);
}

#[test]
fn narrow_words_keep_neighbours_intact_under_contention() {
    // On backends without byte atomics these live inside a 32-bit word.
    let bytes: Arc<[Atomic<u8>; 4]> = Arc::new(core::array::from_fn(|_| Atomic::new(0)));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let bytes = Arc::clone(&bytes);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    bytes[i].fetch_add(1, MemoryOrder::AcqRel);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    for b in bytes.iter() {
        assert_eq!(b.get(), (1_000u32 % 256) as u8);
    }
}

#[test]
fn wide_counter_under_contention() {
    let counter = Arc::new(Atomic::new(0u64));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..5_000 {
                    counter.post_increment();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(counter.get(), 20_000);
}

#[test]
fn bool_and_pointer_cells() {
    let flag = Atomic::new(false);
    assert!(!flag.swap(true, MemoryOrder::AcqRel));
    assert!(flag.load(MemoryOrder::Acquire));

    let mut a = 1u32;
    let mut b = 2u32;
    let p = Atomic::<*mut u32>::null();
    assert!(p.load(MemoryOrder::Acquire).is_null());
    p.store(&mut a, MemoryOrder::Release);
    assert_eq!(p.compare_exchange(&mut a, &mut b, MemoryOrder::AcqRel, MemoryOrder::Acquire), Ok(&mut a as *mut u32));
    // SAFETY: `b` outlives the read.
    assert_eq!(unsafe { *p.load(MemoryOrder::Acquire) }, 2);
}

#[test]
fn floats_update_through_cas() {
    let f = Atomic::new(1.5f32);
    assert_eq!(f.fetch_update(MemoryOrder::AcqRel, MemoryOrder::Acquire, |v| Some(v * 2.0)), Ok(1.5));
    assert_eq!(f.load(MemoryOrder::Acquire), 3.0);
    assert_eq!(f.fetch_update(MemoryOrder::AcqRel, MemoryOrder::Acquire, |_| None), Err(3.0));
}

#[derive(Clone, Copy, Debug, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
struct Version {
    major: u16,
    minor: u16,
}

atomic_pod!(Version => u32);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Config {
    limit: u64,
    name: &'static str,
}

atomic_locked!(Config);

#[test]
fn user_types() {
    let v = Atomic::new(Version { major: 1, minor: 0 });
    let bumped = v.fetch_update(MemoryOrder::AcqRel, MemoryOrder::Acquire, |v| {
        Some(Version {
            minor: v.minor + 1,
            ..v
        })
    });
    assert_eq!(bumped, Ok(Version { major: 1, minor: 0 }));
    assert_eq!(v.get(), Version { major: 1, minor: 1 });
    assert_eq!(v.is_lock_free(), platform::BACKEND != platform::Backend::Fallback);

    let c = Atomic::new(Config { limit: 1, name: "a" });
    assert!(!c.is_lock_free());
    let old = c.exchange(Config { limit: 2, name: "b" }, MemoryOrder::SeqCst);
    assert_eq!(old.name, "a");
    assert_eq!(c.load(MemoryOrder::Acquire).limit, 2);
}

#[test]
fn flag_test_and_set() {
    let flag = AtomicFlag::new(false);
    assert!(!flag.test_and_set(MemoryOrder::AcqRel));
    assert!(flag.test_and_set(MemoryOrder::AcqRel));
    flag.clear(MemoryOrder::Release);
    assert!(!flag.test_and_set(Ordering::Acquire));
    assert_eq!(flag.is_lock_free(), platform::BACKEND != platform::Backend::Fallback);
}

#[test]
fn backend_name_matches_display() {
    assert_eq!(platform::BACKEND.to_string(), platform::BACKEND.name());
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "invalid store ordering")]
fn acquire_store_is_rejected_in_debug() {
    Atomic::new(0u32).store(1, MemoryOrder::Acquire);
}
