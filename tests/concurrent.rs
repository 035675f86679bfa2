//! Multi-producer stress against a single draining consumer.
#![cfg(not(loom))]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use lockless_queue::LocklessQueue;

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 10_000;

fn encode(producer: usize, seq: usize) -> u64 {
    ((producer as u64) << 32) | seq as u64
}

#[test]
fn eight_producers_one_consumer_lose_nothing() {
    let queue = Arc::new(LocklessQueue::new());
    let mut consumer = queue.consumer().unwrap();
    let barrier = Arc::new(Barrier::new(PRODUCERS + 1));
    let finished = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                barrier.wait();
                for seq in 0..PER_PRODUCER {
                    queue.push(encode(p, seq));
                }
                finished.fetch_add(1, Ordering::Release);
            })
        })
        .collect();

    barrier.wait();
    let mut received = Vec::with_capacity(PRODUCERS * PER_PRODUCER);
    loop {
        let done = finished.load(Ordering::Acquire) == PRODUCERS;
        received.extend(consumer.drain());
        if done {
            // All producers finished before this drain started, so it saw everything.
            break;
        }
        thread::yield_now();
    }

    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(received.len(), PRODUCERS * PER_PRODUCER);
    let unique: HashSet<_> = received.iter().copied().collect();
    assert_eq!(unique.len(), received.len(), "duplicate values dequeued");

    // Each producer's own pushes linearize in program order.
    let mut next_seq = [0u64; PRODUCERS];
    for value in &received {
        let producer = (value >> 32) as usize;
        let seq = value & 0xffff_ffff;
        assert_eq!(seq, next_seq[producer], "producer {producer} out of order");
        next_seq[producer] += 1;
    }

    assert!(queue.is_empty());
    assert_eq!(consumer.pop(), None);
}

#[test]
fn values_are_dropped_exactly_once_under_contention() {
    struct Tracked(Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    let drops = Arc::new(AtomicUsize::new(0));
    let queue = Arc::new(LocklessQueue::new());
    let mut consumer = queue.consumer().unwrap();

    thread::scope(|scope| {
        for _ in 0..4 {
            let queue = &queue;
            let drops = &drops;
            scope.spawn(move || {
                for _ in 0..1_000 {
                    queue.push(Tracked(Arc::clone(drops)));
                }
            });
        }
        // Consume part of the stream concurrently; the rest goes down with the queue.
        for _ in 0..1_500 {
            drop(consumer.pop());
        }
    });

    drop(consumer);
    drop(queue);
    assert_eq!(drops.load(Ordering::Relaxed), 4_000);
}

#[test]
fn is_empty_reports_settled_state_from_other_threads() {
    let queue = Arc::new(LocklessQueue::new());
    let mut consumer = queue.consumer().unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..100 {
                queue.push(i);
            }
        });
    });
    assert!(!queue.is_empty());

    assert_eq!(consumer.drain().count(), 100);
    let observed = thread::scope(|scope| scope.spawn(|| queue.is_empty()).join().unwrap());
    assert!(observed);
}
