//! Basic example touring the ring buffers and a two-stage pipeline.
//!
//! This example shows:
//! - push/pop on a generic ring
//! - bulk operations on a `Copy`-element ring
//! - zero-copy write-view commit and read-view consumption
//! - a two-stage pipeline pumping bytes through in-memory adapters
//!
//! Run with: `cargo run --example basic -p sluice`

use std::sync::Arc;

use sluice::pipeline::{BackwardLink, ForwardLink, PipeLine, Stage, StageConfig};
use sluice::prelude::*;
use sluice_adapter_mem::{CopyAdapter, MemRegion};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    // Generic ring: any element type, FIFO, single producer and consumer.
    let ring = BlockingRing::new(1024);
    println!("created ring with capacity {}", ring.capacity());

    ring.try_push("hello".to_string());
    ring.try_push("world".to_string());
    ring.try_push_with(|| "from sluice".to_string());
    println!("ring holds {} elements", ring.len());

    while let Some(item) = ring.try_pop() {
        println!("popped: {}", item);
    }

    // Copy-element ring: bulk operations are wrap-aware byte copies.
    let pod: PodBlockingRing<i32> = PodBlockingRing::new(512);
    let data: Vec<i32> = (1..=10).collect();
    let pushed = pod.try_push_bulk(&data);
    println!("\nbulk pushed {} integers", pushed);

    let mut output = vec![0; pushed];
    let popped = pod.try_pop_bulk(&mut output);
    println!("bulk popped {} integers: {:?}", popped, output);

    // Zero-copy write: borrow free slots, fill them, commit.
    {
        let mut view = pod.write_view(5);
        for (i, slot) in view.as_mut_slice().iter_mut().enumerate() {
            *slot = 100 + i as i32;
        }
        let n = view.capacity();
        view.commit(n).unwrap();
        println!("\nzero-copy wrote {} elements", n);
    }

    // Zero-copy read: borrow stored slots, then retire them.
    {
        let view = pod.read_view(usize::MAX);
        println!("zero-copy read {} elements: {:?}", view.len(), view.as_slice());
        let n = view.len();
        drop(view);
        pod.advance_read(n).unwrap();
    }

    // A two-stage pipeline: 64 bytes through a 16-byte middle ring.
    println!("\n--- pipeline ---");
    let region_a = MemRegion::zeroed(64);
    let region_b = MemRegion::zeroed(16);
    let region_c = MemRegion::zeroed(64);
    let meta = MemRegion::zeroed(32);

    let stage1 = Arc::new(
        Stage::<CopyAdapter, CopyAdapter, CopyAdapter>::new(
            CopyAdapter,
            region_a.window(),
            region_b.window(),
            StageConfig::default(),
        )
        .with_forward_link(ForwardLink::new(
            CopyAdapter,
            meta.window_at(16, 8),
            meta.window_at(8, 8),
            meta.window_at(0, 8),
        )),
    );
    let stage2 = Arc::new(
        Stage::<CopyAdapter, CopyAdapter, CopyAdapter>::new(
            CopyAdapter,
            region_b.window(),
            region_c.window(),
            StageConfig::default(),
        )
        .with_backward_link(BackwardLink::new(
            CopyAdapter,
            meta.window_at(24, 8),
            meta.window_at(0, 8),
            meta.window_at(8, 8),
        )),
    );

    let mut line = PipeLine::new();
    line.push_stage(Arc::clone(&stage1));
    line.push_stage(Arc::clone(&stage2));

    let payload: Vec<u8> = (0..64u32).map(|i| i as u8).collect();
    region_a.write_bytes(0, &payload);
    stage1.advance_src_tail(64);

    while stage2.counters().dst_tail < 64 {
        line.progress().await.expect("pipeline progress failed");
    }

    assert_eq!(region_c.read_bytes(0, 64), payload);
    println!(
        "pipeline delivered 64 bytes: stage1 [{}], stage2 [{}]",
        stage1.counters(),
        stage2.counters()
    );
}
