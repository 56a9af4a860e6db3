//! Model-based checks: drive a ring through operation sequences and verify
//! every step against a `VecDeque` reference model.

use std::collections::VecDeque;

use sluice_core::{DroppingRing, PodDroppingRing};

/// Operations exercised against the model.
#[derive(Clone, Copy, Debug)]
enum RingOp {
    Push(u64),
    Pop,
    BulkPush(u64, usize),
    BulkPop(usize),
}

/// A tiny deterministic generator so the op sequences are reproducible
/// without pulling in an RNG crate.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

fn generate_ops(seed: u64, count: usize) -> Vec<RingOp> {
    let mut lcg = Lcg(seed);
    let mut next_value = 0u64;
    (0..count)
        .map(|_| match lcg.next() % 4 {
            0 => {
                next_value += 1;
                RingOp::Push(next_value)
            }
            1 => RingOp::Pop,
            2 => {
                let len = (lcg.next() % 6) as usize;
                let base = next_value + 1;
                next_value += len as u64;
                RingOp::BulkPush(base, len)
            }
            _ => RingOp::BulkPop((lcg.next() % 6) as usize),
        })
        .collect()
}

fn execute_and_verify(capacity: usize, ops: &[RingOp]) {
    let ring: DroppingRing<u64> = DroppingRing::new(capacity);
    let mut model: VecDeque<u64> = VecDeque::new();
    let capacity = ring.capacity();

    for (i, op) in ops.iter().enumerate() {
        match *op {
            RingOp::Push(value) => {
                let accepted = ring.try_push(value);
                assert_eq!(
                    accepted,
                    model.len() < capacity,
                    "op {}: push acceptance must mirror the model",
                    i
                );
                if accepted {
                    model.push_back(value);
                }
            }
            RingOp::Pop => {
                assert_eq!(ring.try_pop(), model.pop_front(), "op {}: pop mismatch", i);
            }
            RingOp::BulkPush(base, len) => {
                let items: Vec<u64> = (base..base + len as u64).collect();
                let pushed = ring.try_push_bulk(&items);
                let expected = len.min(capacity - model.len());
                assert_eq!(pushed, expected, "op {}: bulk push count", i);
                model.extend(&items[..pushed]);
            }
            RingOp::BulkPop(len) => {
                let mut out = vec![0u64; len];
                let popped = ring.try_pop_bulk(&mut out);
                assert_eq!(popped, len.min(model.len()), "op {}: bulk pop count", i);
                for value in &out[..popped] {
                    assert_eq!(Some(*value), model.pop_front(), "op {}: bulk pop order", i);
                }
            }
        }

        // Invariants after every operation.
        assert_eq!(ring.len(), model.len(), "op {}: len mismatch", i);
        assert!(ring.len() <= capacity, "op {}: len exceeds capacity", i);
        assert_eq!(ring.is_empty(), model.is_empty(), "op {}", i);
        assert_eq!(ring.is_full(), model.len() == capacity, "op {}", i);
        let status = ring.status();
        assert!(status.head >= status.tail, "op {}: head behind tail", i);
        assert_eq!(
            (status.head - status.tail) as usize,
            model.len(),
            "op {}: counter delta",
            i
        );
    }
}

#[test]
fn generic_ring_matches_model_small_capacity() {
    for seed in 0..8 {
        execute_and_verify(4, &generate_ops(seed, 2000));
    }
}

#[test]
fn generic_ring_matches_model_larger_capacity() {
    for seed in 0..4 {
        execute_and_verify(64, &generate_ops(0xB00F + seed, 4000));
    }
}

#[test]
fn pod_ring_matches_model_through_views() {
    // Same walk, but consuming through the zero-copy surface.
    let ring: PodDroppingRing<u64> = PodDroppingRing::new(8);
    let mut model: VecDeque<u64> = VecDeque::new();
    let capacity = ring.capacity();
    let mut lcg = Lcg(0x5EED);
    let mut next_value = 0u64;

    for i in 0..4000 {
        if lcg.next() % 2 == 0 {
            let len = (lcg.next() % 5) as usize;
            let items: Vec<u64> = (next_value..next_value + len as u64).collect();
            next_value += len as u64;

            let mut view = ring.split_write_view(len);
            let written = view.write(&items);
            assert_eq!(written, len.min(capacity - model.len()), "op {}", i);
            view.commit(written).unwrap();
            model.extend(&items[..written]);
        } else {
            let take = (lcg.next() % 5) as usize;
            let [first, second] = ring.read_views(take);
            let seen: Vec<u64> = first.iter().chain(second.iter()).copied().collect();
            assert_eq!(seen.len(), take.min(model.len()), "op {}", i);
            for value in &seen {
                assert_eq!(Some(*value), model.pop_front(), "op {}: view order", i);
            }
            ring.advance_read(seen.len()).unwrap();
        }

        assert_eq!(ring.len(), model.len(), "op {}", i);
    }
}
