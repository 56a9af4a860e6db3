//! End-to-end pipeline tests over the in-memory adapters.

use std::sync::Arc;

use sluice_adapter_mem::{CopyAdapter, FailingAdapter, MemRegion, SharedRegionAdapter};
use sluice_pipeline::{BackwardLink, ForwardLink, PipeLine, Stage, StageConfig};

type CopyStage = Stage<CopyAdapter, CopyAdapter, CopyAdapter>;

/// Metadata cells and staging windows for one stage-to-stage link.
struct LinkCells {
    region: MemRegion,
}

impl LinkCells {
    fn new() -> Self {
        Self {
            region: MemRegion::zeroed(32),
        }
    }

    /// Cell the upstream tail is shipped into.
    fn tail_cell(&self) -> sluice_adapter_mem::MemWindow {
        self.region.window_at(0, 8)
    }

    /// Cell the downstream head is shipped into.
    fn head_cell(&self) -> sluice_adapter_mem::MemWindow {
        self.region.window_at(8, 8)
    }

    fn forward_staging(&self) -> sluice_adapter_mem::MemWindow {
        self.region.window_at(16, 8)
    }

    fn backward_staging(&self) -> sluice_adapter_mem::MemWindow {
        self.region.window_at(24, 8)
    }

    fn forward_link(&self) -> ForwardLink<CopyAdapter> {
        ForwardLink::new(
            CopyAdapter,
            self.forward_staging(),
            self.head_cell(),
            self.tail_cell(),
        )
    }

    fn backward_link(&self) -> BackwardLink<CopyAdapter> {
        BackwardLink::new(
            CopyAdapter,
            self.backward_staging(),
            self.tail_cell(),
            self.head_cell(),
        )
    }
}

#[tokio::test]
async fn two_stage_chain_delivers_bytes_in_order() {
    // 64 payload bytes squeezed through a 16-byte middle ring: the middle
    // region wraps four times, so chunking, metadata propagation and
    // space reclamation all get exercised.
    let region_a = MemRegion::zeroed(64);
    let region_b = MemRegion::zeroed(16);
    let region_c = MemRegion::zeroed(64);
    let link = LinkCells::new();

    let stage1: Arc<CopyStage> = Arc::new(
        Stage::new(
            CopyAdapter,
            region_a.window(),
            region_b.window(),
            StageConfig::default(),
        )
        .with_forward_link(link.forward_link()),
    );
    let stage2: Arc<CopyStage> = Arc::new(
        Stage::new(
            CopyAdapter,
            region_b.window(),
            region_c.window(),
            StageConfig::default(),
        )
        .with_backward_link(link.backward_link()),
    );

    let mut line = PipeLine::new();
    line.push_stage(Arc::clone(&stage1));
    line.push_stage(Arc::clone(&stage2));
    assert_eq!(line.len(), 2);

    let payload: Vec<u8> = (0..64u32).map(|i| (i * 5 + 1) as u8).collect();
    region_a.write_bytes(0, &payload);
    stage1.advance_src_tail(64);

    let mut passes = 0;
    while stage2.counters().dst_tail < 64 {
        line.progress().await.expect("progress should succeed");
        passes += 1;
        assert!(passes < 64, "pipeline made no progress: {}", stage2.counters());
    }

    assert_eq!(region_c.read_bytes(0, 64), payload);
    assert_eq!(stage1.counters().src_head, 64);
    assert_eq!(stage2.counters().src_tail, 64);
}

#[tokio::test]
async fn trickled_production_still_arrives_contiguously() {
    let region_a = MemRegion::zeroed(32);
    let region_b = MemRegion::zeroed(8);
    let region_c = MemRegion::zeroed(32);
    let link = LinkCells::new();

    let stage1: Arc<CopyStage> = Arc::new(
        Stage::new(
            CopyAdapter,
            region_a.window(),
            region_b.window(),
            StageConfig::default(),
        )
        .with_forward_link(link.forward_link()),
    );
    let stage2: Arc<CopyStage> = Arc::new(
        Stage::new(
            CopyAdapter,
            region_b.window(),
            region_c.window(),
            StageConfig::default(),
        )
        .with_backward_link(link.backward_link()),
    );

    let mut line = PipeLine::new();
    line.push_stage(Arc::clone(&stage1));
    line.push_stage(Arc::clone(&stage2));

    // Produce in uneven dribbles; the consumer must still observe a
    // strictly contiguous prefix at every point.
    let payload: Vec<u8> = (0..32u32).map(|i| (i ^ 0x5A) as u8).collect();
    let mut produced = 0usize;
    for chunk in [3usize, 5, 1, 7, 9, 2, 5] {
        region_a.write_bytes(produced, &payload[produced..produced + chunk]);
        stage1.advance_src_tail(chunk as u32);
        produced += chunk;

        for _ in 0..8 {
            line.progress().await.expect("progress should succeed");
        }

        let arrived = stage2.counters().dst_tail as usize;
        assert!(arrived <= produced);
        assert_eq!(
            region_c.read_bytes(0, arrived),
            payload[..arrived],
            "consumer must see a contiguous prefix"
        );
    }

    for _ in 0..16 {
        line.progress().await.expect("progress should succeed");
    }
    assert_eq!(stage2.counters().dst_tail as usize, produced);
    assert_eq!(region_c.read_bytes(0, produced), payload[..produced]);
}

#[tokio::test]
async fn single_stage_shared_region_is_zero_copy() {
    // Shared-memory deployment: source and destination alias one region,
    // the adapter never copies, only the counters move.
    let region = MemRegion::zeroed(32);
    let stage: Stage<SharedRegionAdapter, CopyAdapter, CopyAdapter> = Stage::new(
        SharedRegionAdapter,
        region.window(),
        region.window(),
        StageConfig::default(),
    );

    region.write_bytes(0, &[7; 24]);
    stage.advance_src_tail(24);
    stage.transfer().await.expect("transfer should succeed");

    let counters = stage.counters();
    assert_eq!(counters.src_head, 24);
    assert_eq!(counters.dst_tail, 24);
    assert_eq!(region.read_bytes(0, 24), vec![7; 24]);
}

#[tokio::test]
async fn failed_transfer_preserves_counters_for_retry() {
    let region_src = MemRegion::zeroed(16);
    let region_dst = MemRegion::zeroed(16);
    let stage: Stage<FailingAdapter, CopyAdapter, CopyAdapter> = Stage::new(
        FailingAdapter,
        region_src.window(),
        region_dst.window(),
        StageConfig::default(),
    );

    stage.advance_src_tail(8);
    let error = stage.transfer().await.expect_err("transfer must fail");
    assert!(error.to_string().contains("transfer refused"));

    // Pre-batch counters retained: nothing was committed or published.
    let counters = stage.counters();
    assert_eq!(counters.src_head, 0);
    assert_eq!(counters.dst_tail, 0);
    assert_eq!(counters.src_tail, 8);

    // The same failure surfaces through a line.
    let mut line = PipeLine::new();
    line.push_stage(stage);
    assert!(line.progress().await.is_err());
}

#[tokio::test]
async fn destination_backpressure_halts_forward_progress() {
    // No consumer ever advances dst_head, so exactly one destination
    // ring's worth of bytes may move, no matter how much is produced.
    let region_src = MemRegion::zeroed(64);
    let region_dst = MemRegion::zeroed(16);
    let stage: Stage<CopyAdapter, CopyAdapter, CopyAdapter> = Stage::new(
        CopyAdapter,
        region_src.window(),
        region_dst.window(),
        StageConfig::default(),
    );

    region_src.write_bytes(0, &[1; 64]);
    stage.advance_src_tail(64);
    for _ in 0..4 {
        stage.transfer().await.expect("transfer should succeed");
    }
    assert_eq!(stage.counters().dst_tail, 16);
    assert_eq!(stage.counters().src_head, 16);

    // Draining the destination reopens the window.
    stage.advance_dst_head(16);
    stage.transfer().await.expect("transfer should succeed");
    assert_eq!(stage.counters().dst_tail, 32);
}
