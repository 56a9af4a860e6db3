//! The pipeline: an owned chain of stages driven in order.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::adapter::{Adapter, TransferError};
use crate::stage::Stage;

/// Object-safe handle the [`PipeLine`] drives its stages through.
///
/// Stages are generic over three adapter types; the line erases them so a
/// single chain can mix transports.
pub trait DriveStage: Send + Sync {
    /// Run one [`Stage::transfer`] tick.
    fn drive(&self) -> BoxFuture<'_, Result<(), TransferError>>;
}

impl<A: Adapter, FM: Adapter, BM: Adapter> DriveStage for Stage<A, FM, BM> {
    fn drive(&self) -> BoxFuture<'_, Result<(), TransferError>> {
        self.transfer().boxed()
    }
}

/// A line can share stages with a driver that still needs to advance the
/// outward-facing counters of the chain ends.
impl<S: DriveStage + ?Sized> DriveStage for std::sync::Arc<S> {
    fn drive(&self) -> BoxFuture<'_, Result<(), TransferError>> {
        (**self).drive()
    }
}

/// An owned chain of pipeline stages.
///
/// The line owns its stages exclusively; neighboring stages never hold
/// references to each other — counter propagation rides the metadata
/// planes instead. [`progress`](Self::progress) drives each stage one
/// tick in insertion (upstream-to-downstream) order; the executor is
/// whichever runtime polls it.
#[derive(Default)]
pub struct PipeLine {
    stages: Vec<Box<dyn DriveStage>>,
}

impl PipeLine {
    /// An empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage at the downstream end.
    pub fn push_stage(&mut self, stage: impl DriveStage + 'static) {
        self.stages.push(Box::new(stage));
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the line has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Drive every stage one transfer tick, upstream first.
    ///
    /// A stage failure stops the pass and propagates; the failed stage
    /// keeps its pre-batch counters, so the next pass reattempts.
    pub async fn progress(&self) -> Result<(), TransferError> {
        for stage in &self.stages {
            stage.drive().await?;
        }
        Ok(())
    }
}
