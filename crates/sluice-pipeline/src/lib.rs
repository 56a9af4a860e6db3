//! sluice-pipeline: segmented data movement over pluggable transports.
//!
//! A [`PipeLine`] is a chain of [`Stage`]s. Each stage owns a local
//! ring-like source region and a destination window that may live in a
//! different address space; data moves through an [`Adapter`] and the
//! head/tail counters that govern the ring discipline are shipped between
//! peers through two more adapters (the metadata planes).
//!
//! ```text
//!   producer ─▶ [ src region ]──A.transfer──▶[ dst region ] ─▶ next stage
//!                    ▲   tail──forward plane──▶src_tail  ▲
//!                    └──src_head◀──backward plane──head──┘
//! ```
//!
//! Data-plane transfers are issued in bounded batches and committed
//! strictly in starting-offset order (see [`PendingUpdate`]), so a
//! downstream peer always observes a contiguous prefix even when
//! individual transfers complete out of order. A failed transfer leaves
//! the stage's counters at their pre-batch values; the next
//! [`Stage::transfer`] tick reissues the work.
//!
//! The concrete transports are not part of this crate: anything providing
//! the [`Adapter`] contract plugs in, from a no-op shared-memory copy to a
//! one-sided remote write.

#![forbid(unsafe_op_in_unsafe_fn)]

mod adapter;
mod line;
mod meta;
mod stage;

pub use adapter::{Adapter, LocalWindow, RemoteWindow, TransferError};
pub use line::{DriveStage, PipeLine};
pub use meta::{BackwardLink, ForwardLink, MetaCell, META_WINDOW_BYTES};
pub use stage::{PendingUpdate, Stage, StageConfig, StageCounters, DEFAULT_MAX_INFLIGHT};
