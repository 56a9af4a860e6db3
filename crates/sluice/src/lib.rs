//! sluice: high-throughput in-process and cross-node data movement.
//!
//! # Quick Start
//!
//! Single-producer / single-consumer ring buffers with three overflow
//! policies:
//!
//! ```
//! use sluice::prelude::*;
//!
//! let ring = DroppingRing::new(1024);
//! assert!(ring.try_push("hello"));
//! assert_eq!(ring.try_pop(), Some("hello"));
//! ```
//!
//! For trivially copyable elements, [`PodRing`] adds wrap-aware bulk
//! copies and zero-copy borrowed views:
//!
//! ```
//! use sluice::prelude::*;
//!
//! let ring: PodBlockingRing<u32> = PodBlockingRing::new(64);
//! ring.try_push_bulk(&[1, 2, 3]);
//!
//! let view = ring.read_view(usize::MAX);
//! assert_eq!(view.as_slice(), &[1, 2, 3]);
//! let n = view.len();
//! drop(view);
//! ring.advance_read(n).unwrap();
//! ```
//!
//! # Pipelines
//!
//! The [`pipeline`] module composes ring-disciplined byte movement across
//! transports: each [`pipeline::Stage`] forwards its source window through
//! an [`pipeline::Adapter`] and ships head/tail counters to its neighbors
//! through two more. Transports are pluggable; an in-memory pair for tests
//! and demos lives in the `sluice-adapter-mem` crate.

#![forbid(unsafe_op_in_unsafe_fn)]

pub use sluice_core::{
    Blocking, BlockingRing, Dropping, DroppingRing, FixedVec, OverflowPolicy, Overwriting,
    OverwritingRing, PodBlockingRing, PodDroppingRing, PodOverwritingRing, PodRing, PolicyKind,
    ReadView, Ring, RingError, RingStatus, Segment, SplitWriteView, WriteView,
};

/// Segmented transfer pipelines and the adapter contract.
pub mod pipeline {
    pub use sluice_pipeline::{
        Adapter, BackwardLink, DriveStage, ForwardLink, LocalWindow, MetaCell, PendingUpdate,
        PipeLine, RemoteWindow, Stage, StageConfig, StageCounters, TransferError,
        DEFAULT_MAX_INFLIGHT, META_WINDOW_BYTES,
    };
}

/// Prelude module for convenient imports.
///
/// ```
/// use sluice::prelude::*;
/// ```
pub mod prelude {
    pub use crate::pipeline::{Adapter, PipeLine, Stage, StageConfig, TransferError};
    pub use crate::{
        BlockingRing, DroppingRing, FixedVec, OverwritingRing, PodBlockingRing, PodDroppingRing,
        PodOverwritingRing, PodRing, Ring, RingError,
    };
}
