//! A pipeline stage: one hop of ring-disciplined data movement.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU32, Ordering};

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::adapter::{Adapter, LocalWindow, RemoteWindow, TransferError};
use crate::meta::{BackwardLink, ForwardLink};

/// Cap on concurrently outstanding data-plane transfers per
/// [`Stage::transfer`] call.
pub const DEFAULT_MAX_INFLIGHT: usize = 16;

/// Tuning knobs for a stage.
#[derive(Debug, Clone, Copy)]
pub struct StageConfig {
    /// Maximum transfers in flight within one forward batch.
    pub max_inflight: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            max_inflight: DEFAULT_MAX_INFLIGHT,
        }
    }
}

/// A completed transfer waiting for in-order commit.
///
/// The heap orders updates by `before_src_head` — the transfer's starting
/// source offset — so counters only ever advance over a contiguous
/// completed prefix, and a straggling earlier transfer delays the commit
/// of later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PendingUpdate {
    pub before_src_head: u32,
    pub before_dst_tail: u32,
    pub after_src_head: u32,
    pub after_dst_tail: u32,
}

/// Counter snapshot of a stage, for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct StageCounters {
    /// Bytes the producer side has filled.
    pub src_tail: u32,
    /// Bytes handed off downstream.
    pub src_head: u32,
    /// Bytes handed to the next stage.
    pub dst_tail: u32,
    /// Bytes the next stage has consumed.
    pub dst_head: u32,
}

impl std::fmt::Display for StageCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "src {}..{} dst {}..{}",
            self.src_head, self.src_tail, self.dst_head, self.dst_tail
        )
    }
}

/// One hop of a [`PipeLine`](crate::PipeLine).
///
/// The stage copies `[src_head, src_tail)` of its source region into the
/// destination window `[dst_tail, ..)` through the data-plane adapter `A`,
/// treating both regions as rings of their respective byte capacities.
/// Counter synchronization with the neighbor stages rides the forward
/// (`FM`) and backward (`BM`) metadata planes; a stage at either end of
/// the chain simply has no link on that side, and its outward-facing
/// counters are advanced by the local driver through
/// [`advance_src_tail`](Self::advance_src_tail) and
/// [`advance_dst_head`](Self::advance_dst_head).
pub struct Stage<A: Adapter, FM: Adapter, BM: Adapter> {
    config: StageConfig,
    adapter: A,
    src: A::Local,
    dst: A::Remote,
    src_capacity: u32,
    dst_capacity: u32,

    // Cached counters. Plain task-local state; atomics make the
    // diagnostic reads from other threads well-defined.
    src_tail: AtomicU32,
    src_head: AtomicU32,
    dst_tail: AtomicU32,
    dst_head: AtomicU32,
    published_src_head: AtomicU32,
    published_dst_tail: AtomicU32,

    pending: Mutex<BinaryHeap<Reverse<PendingUpdate>>>,

    forward_link: Option<ForwardLink<FM>>,
    backward_link: Option<BackwardLink<BM>>,
}

impl<A: Adapter, FM: Adapter, BM: Adapter> Stage<A, FM, BM> {
    /// Create a stage moving bytes from `src` into `dst`.
    ///
    /// Both window sizes must be nonzero; they become the ring capacities
    /// the counters are interpreted against.
    pub fn new(adapter: A, src: A::Local, dst: A::Remote, config: StageConfig) -> Self {
        let src_capacity = src.size_bytes() as u32;
        let dst_capacity = dst.size_bytes() as u32;
        assert!(src_capacity > 0, "source window must be nonzero");
        assert!(dst_capacity > 0, "destination window must be nonzero");
        assert!(config.max_inflight > 0, "max_inflight must be nonzero");
        Self {
            config,
            adapter,
            src,
            dst,
            src_capacity,
            dst_capacity,
            src_tail: AtomicU32::new(0),
            src_head: AtomicU32::new(0),
            dst_tail: AtomicU32::new(0),
            dst_head: AtomicU32::new(0),
            published_src_head: AtomicU32::new(0),
            published_dst_tail: AtomicU32::new(0),
            pending: Mutex::new(BinaryHeap::new()),
            forward_link: None,
            backward_link: None,
        }
    }

    /// Attach the metadata plane toward the next (downstream) stage.
    pub fn with_forward_link(mut self, link: ForwardLink<FM>) -> Self {
        self.forward_link = Some(link);
        self
    }

    /// Attach the metadata plane toward the previous (upstream) stage.
    pub fn with_backward_link(mut self, link: BackwardLink<BM>) -> Self {
        self.backward_link = Some(link);
        self
    }

    /// Source ring capacity in bytes.
    pub fn src_capacity(&self) -> u32 {
        self.src_capacity
    }

    /// Destination ring capacity in bytes.
    pub fn dst_capacity(&self) -> u32 {
        self.dst_capacity
    }

    /// Snapshot of the cached counters.
    pub fn counters(&self) -> StageCounters {
        StageCounters {
            src_tail: self.src_tail.load(Ordering::Relaxed),
            src_head: self.src_head.load(Ordering::Relaxed),
            dst_tail: self.dst_tail.load(Ordering::Relaxed),
            dst_head: self.dst_head.load(Ordering::Relaxed),
        }
    }

    /// Record that the local producer filled `bytes` more of the source
    /// region. For the first stage of a chain, which has no upstream
    /// metadata plane feeding `src_tail`.
    pub fn advance_src_tail(&self, bytes: u32) {
        let tail = self.src_tail.load(Ordering::Relaxed);
        self.src_tail
            .store(tail.wrapping_add(bytes), Ordering::Relaxed);
    }

    /// Record that the local consumer drained `bytes` from the
    /// destination region. For the last stage of a chain, which has no
    /// downstream metadata plane feeding `dst_head`.
    pub fn advance_dst_head(&self, bytes: u32) {
        let head = self.dst_head.load(Ordering::Relaxed);
        self.dst_head
            .store(head.wrapping_add(bytes), Ordering::Relaxed);
    }

    /// Drive one increment of work: the forward (data + tail) and
    /// backward (head) passes run concurrently.
    ///
    /// A failure from either plane is propagated after the counters are
    /// restored to their pre-batch values; calling `transfer` again
    /// reattempts the same window.
    pub async fn transfer(&self) -> Result<(), TransferError> {
        futures::future::try_join(self.forward(), self.backward()).await?;
        Ok(())
    }

    /// Move available source bytes downstream and publish the new tail.
    async fn forward(&self) -> Result<(), TransferError> {
        if self.src_tail.load(Ordering::Relaxed) == self.src_head.load(Ordering::Relaxed) {
            self.fetch_tail();
            self.fetch_head();
            if self.src_tail.load(Ordering::Relaxed) == self.src_head.load(Ordering::Relaxed) {
                return Ok(());
            }
        }

        let entry_src_head = self.src_head.load(Ordering::Relaxed);
        let entry_dst_tail = self.dst_tail.load(Ordering::Relaxed);
        let src_tail = self.src_tail.load(Ordering::Relaxed);
        let dst_head = self.dst_head.load(Ordering::Relaxed);

        // Issue a bounded batch of contiguous-chunk transfers. Chunks are
        // bounded by the wrap of either ring, so each one is a single
        // contiguous byte range on both sides.
        let mut inflight = FuturesUnordered::new();
        let mut issue_head = entry_src_head;
        let mut issue_tail = entry_dst_tail;
        while inflight.len() < self.config.max_inflight {
            let src_index = issue_head % self.src_capacity;
            let dst_index = issue_tail % self.dst_capacity;
            let src_len = (src_tail.wrapping_sub(issue_head)).min(self.src_capacity - src_index);
            let dst_len = (self.dst_capacity - issue_tail.wrapping_sub(dst_head))
                .min(self.dst_capacity - dst_index);
            let len = src_len.min(dst_len);
            if len == 0 {
                break;
            }

            let update = PendingUpdate {
                before_src_head: issue_head,
                before_dst_tail: issue_tail,
                after_src_head: issue_head.wrapping_add(len),
                after_dst_tail: issue_tail.wrapping_add(len),
            };
            let src = self.src.slice(src_index as usize, len as usize);
            let dst = self.dst.slice(dst_index as usize, len as usize);
            inflight.push(async move {
                self.adapter.transfer(src, dst).await?;
                Ok::<PendingUpdate, TransferError>(update)
            });

            issue_head = update.after_src_head;
            issue_tail = update.after_dst_tail;
        }

        if inflight.is_empty() {
            return Ok(());
        }
        trace!(
            transfers = inflight.len(),
            bytes = issue_head.wrapping_sub(entry_src_head),
            "issued forward batch"
        );

        // Commit completions in starting-offset order.
        let mut failure = None;
        while let Some(completed) = inflight.next().await {
            match completed {
                Ok(update) => {
                    let mut pending = self.pending.lock();
                    pending.push(Reverse(update));
                    while let Some(Reverse(next)) = pending.peek().copied() {
                        if next.before_src_head != self.src_head.load(Ordering::Relaxed) {
                            break;
                        }
                        self.src_head.store(next.after_src_head, Ordering::Relaxed);
                        self.dst_tail.store(next.after_dst_tail, Ordering::Relaxed);
                        pending.pop();
                    }
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        drop(inflight);

        if let Some(error) = failure {
            // No partial commit: rewind to the pre-batch counters so the
            // next tick reissues the whole window.
            self.src_head.store(entry_src_head, Ordering::Relaxed);
            self.dst_tail.store(entry_dst_tail, Ordering::Relaxed);
            self.pending.lock().clear();
            warn!(%error, "forward batch failed, counters rewound");
            return Err(error);
        }

        debug_assert!(self.pending.lock().is_empty(), "batch left stragglers");
        self.sync_tail().await
    }

    /// Refresh the downstream head and publish our consumption upstream.
    async fn backward(&self) -> Result<(), TransferError> {
        self.fetch_head();
        if self.src_head.load(Ordering::Relaxed) != self.published_src_head.load(Ordering::Relaxed)
        {
            self.sync_head().await?;
        }
        Ok(())
    }

    /// Load the upstream-published tail from the backward link's cell.
    pub fn fetch_tail(&self) {
        if let Some(link) = &self.backward_link {
            self.src_tail.store(link.fetch_tail(), Ordering::Relaxed);
        }
    }

    /// Load the downstream-published head from the forward link's cell.
    pub fn fetch_head(&self) {
        if let Some(link) = &self.forward_link {
            self.dst_head.store(link.fetch_head(), Ordering::Relaxed);
        }
    }

    /// Ship `dst_tail` to the downstream stage, where it lands as that
    /// stage's `src_tail`.
    pub async fn sync_tail(&self) -> Result<(), TransferError> {
        let Some(link) = &self.forward_link else {
            return Ok(());
        };
        let tail = self.dst_tail.load(Ordering::Relaxed);
        if tail == self.published_dst_tail.load(Ordering::Relaxed) {
            return Ok(());
        }
        link.store_tail(tail).await?;
        self.published_dst_tail.store(tail, Ordering::Relaxed);
        debug!(tail, "published tail downstream");
        Ok(())
    }

    /// Ship `src_head` to the upstream stage, where it lands as that
    /// stage's `dst_head`.
    pub async fn sync_head(&self) -> Result<(), TransferError> {
        let Some(link) = &self.backward_link else {
            return Ok(());
        };
        let head = self.src_head.load(Ordering::Relaxed);
        link.store_head(head).await?;
        self.published_src_head.store(head, Ordering::Relaxed);
        debug!(head, "published head upstream");
        Ok(())
    }
}
