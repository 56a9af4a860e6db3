//! sluice-core: SPSC lock-free ring buffers with zero-copy views.
//!
//! This crate provides the data-movement primitives the rest of the
//! workspace is built on:
//!
//! - [`Ring`] — a single-producer / single-consumer ring buffer over any
//!   element type, with three overflow policies selected at compile time.
//! - [`PodRing`] — the same semantics specialized for `Copy` element types:
//!   wrap-aware bulk byte copies, zero-copy read and write views, and a raw
//!   reserve/advance escape hatch.
//! - [`ReadView`], [`WriteView`], [`SplitWriteView`] — borrowed spans into
//!   the ring storage with deferred-commit semantics.
//! - [`FixedVec`] — a fixed-capacity inline sequence used to carry the at
//!   most two segments a wrapped view decomposes into.
//!
//! # Design
//!
//! Head and tail are monotonically increasing 64-bit counters; the storage
//! index is `counter & (capacity - 1)` with capacity rounded up to a power
//! of two. Each counter lives in its own cache line. The producer publishes
//! `head` with a release store and the consumer observes it with an acquire
//! load; symmetrically for `tail`. Both rings are single objects shared by
//! exactly two parties:
//!
//! ```text
//!             ┌──────────────────────────────────────────────┐
//!  producer ─▶│ head ░░ filled slots [tail, head) ░░ tail    │─▶ consumer
//!             │        (capacity power-of-two, masked)       │
//!             └──────────────────────────────────────────────┘
//! ```
//!
//! # SPSC contract
//!
//! The rings are `Sync`, but correctness relies on a role split: at most one
//! thread performs producer operations (`try_push*`, write views) and at
//! most one thread performs consumer operations (`try_pop*`, `try_peek`,
//! read views, `advance_read`) at any point in time. The `Overwriting`
//! policy additionally requires the consumer to be quiescent while the
//! producer pushes, because eviction advances the consumer's counter from
//! the producer's thread.

#![forbid(unsafe_op_in_unsafe_fn)]

mod error;
mod policy;
mod pod;
mod raw;
mod ring;
mod seq;
mod view;

pub use error::RingError;
pub use policy::{Blocking, Dropping, OverflowPolicy, Overwriting, PolicyKind};
pub use pod::PodRing;
pub use ring::{Ring, RingStatus};
pub use seq::FixedVec;
pub use view::{ReadView, Segment, SplitWriteView, WriteView};

/// A blocking ring: `try_push` spin-yields until space appears.
pub type BlockingRing<T> = Ring<T, Blocking>;
/// A dropping ring: `try_push` returns `false` when full.
pub type DroppingRing<T> = Ring<T, Dropping>;
/// An overwriting ring: `try_push` evicts the oldest element when full.
pub type OverwritingRing<T> = Ring<T, Overwriting>;

/// Blocking ring specialized for `Copy` elements.
pub type PodBlockingRing<T> = PodRing<T, Blocking>;
/// Dropping ring specialized for `Copy` elements.
pub type PodDroppingRing<T> = PodRing<T, Dropping>;
/// Overwriting ring specialized for `Copy` elements.
pub type PodOverwritingRing<T> = PodRing<T, Overwriting>;
