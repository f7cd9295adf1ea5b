#![cfg(feature = "loom")]

//! Run with `cargo test --features loom --test loom_ringbuffer`.
//!
//! The buffers are leaked so that their halves are `'static` and can move
//! into loom threads.

use halo_atomic::{DynRingBuffer, RingBuffer};
use loom::thread;

#[test]
fn test_spsc_handoff_loom() {
    loom::model(|| {
        let ring: &'static mut RingBuffer<usize, 3> = Box::leak(Box::new(RingBuffer::new()));
        let (mut tx, mut rx) = ring.split();

        let producer = thread::spawn(move || {
            tx.enqueue(10).unwrap();
            tx.enqueue(20).unwrap();
        });

        let mut got = Vec::new();
        while got.len() < 2 {
            match rx.dequeue() {
                Some(v) => got.push(v),
                None => thread::yield_now(),
            }
        }
        assert_eq!(got, [10, 20]);
        producer.join().unwrap();
    });
}

#[test]
fn test_spsc_wrap_loom() {
    loom::model(|| {
        let ring: &'static mut DynRingBuffer<usize> = Box::leak(Box::new(DynRingBuffer::with_capacity(1)));
        let (mut tx, mut rx) = ring.split();

        let producer = thread::spawn(move || {
            for i in 1..=3 {
                let mut item = i;
                while let Err(full) = tx.enqueue(item) {
                    item = full.into_inner();
                    thread::yield_now();
                }
            }
        });

        let mut expected = 1;
        while expected <= 3 {
            match rx.dequeue() {
                Some(v) => {
                    assert_eq!(v, expected);
                    expected += 1;
                }
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();
        assert!(rx.is_empty());
    });
}
