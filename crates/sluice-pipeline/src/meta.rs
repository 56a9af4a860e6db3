//! The metadata plane: 8-byte counter cells shipped between peers.
//!
//! # Wire layout
//!
//! Each metadata window is exactly 8 bytes, naturally aligned, host byte
//! order (same-endianness peers). The first 4 bytes hold an unsigned
//! 32-bit counter — the tail on the forward plane, the head on the
//! backward plane. The remaining 4 bytes are reserved: written zero,
//! never read.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::adapter::{Adapter, LocalWindow, TransferError};

/// Size of a metadata window in bytes.
pub const META_WINDOW_BYTES: usize = 8;

/// The shared layout of a metadata window.
#[repr(C, align(8))]
pub struct MetaCell {
    counter: AtomicU32,
    reserved: AtomicU32,
}

const _: () = assert!(std::mem::size_of::<MetaCell>() == META_WINDOW_BYTES);
const _: () = assert!(std::mem::align_of::<MetaCell>() == META_WINDOW_BYTES);

impl MetaCell {
    /// A zeroed cell.
    pub const fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
            reserved: AtomicU32::new(0),
        }
    }

    /// Read the counter (acquire).
    #[inline]
    pub fn load(&self) -> u32 {
        self.counter.load(Ordering::Acquire)
    }

    /// Write the counter (release) and zero the reserved word.
    #[inline]
    pub fn store(&self, value: u32) {
        self.reserved.store(0, Ordering::Relaxed);
        self.counter.store(value, Ordering::Release);
    }
}

impl Default for MetaCell {
    fn default() -> Self {
        Self::new()
    }
}

/// View an 8-byte local window as a [`MetaCell`].
///
/// The adapter contract guarantees the region outlives the handle, so the
/// returned borrow is tied to the window's.
fn cell_of<L: LocalWindow>(window: &L) -> &MetaCell {
    assert!(
        window.size_bytes() >= META_WINDOW_BYTES,
        "metadata window must be at least {} bytes",
        META_WINDOW_BYTES
    );
    let ptr = window.data().cast::<MetaCell>();
    assert!(
        ptr.is_aligned(),
        "metadata window must be naturally aligned"
    );
    // SAFETY: size and alignment checked above; MetaCell is a pair of
    // atomics, so shared access from both peers is the intended use.
    unsafe { &*ptr }
}

/// The forward metadata plane: ship this stage's `dst_tail` downstream,
/// observe the downstream `dst_head` landing locally.
pub struct ForwardLink<M: Adapter> {
    adapter: M,
    /// Scratch window the tail is staged in before shipping.
    staging: M::Local,
    /// Where the downstream stage's backward plane lands its head.
    head_in: M::Local,
    /// The downstream stage's tail cell.
    tail_out: M::Remote,
}

impl<M: Adapter> ForwardLink<M> {
    pub fn new(adapter: M, staging: M::Local, head_in: M::Local, tail_out: M::Remote) -> Self {
        debug_assert!(staging.size_bytes() >= META_WINDOW_BYTES);
        debug_assert!(head_in.size_bytes() >= META_WINDOW_BYTES);
        Self {
            adapter,
            staging,
            head_in,
            tail_out,
        }
    }

    /// The downstream head most recently landed here.
    pub fn fetch_head(&self) -> u32 {
        cell_of(&self.head_in).load()
    }

    /// Ship `tail` to the downstream stage's tail cell.
    pub async fn store_tail(&self, tail: u32) -> Result<(), TransferError> {
        cell_of(&self.staging).store(tail);
        self.adapter
            .transfer(self.staging.clone(), self.tail_out.clone())
            .await
    }
}

/// The backward metadata plane: ship this stage's `src_head` upstream,
/// observe the upstream `src_tail` landing locally.
pub struct BackwardLink<M: Adapter> {
    adapter: M,
    /// Scratch window the head is staged in before shipping.
    staging: M::Local,
    /// Where the upstream stage's forward plane lands its tail.
    tail_in: M::Local,
    /// The upstream stage's head cell.
    head_out: M::Remote,
}

impl<M: Adapter> BackwardLink<M> {
    pub fn new(adapter: M, staging: M::Local, tail_in: M::Local, head_out: M::Remote) -> Self {
        debug_assert!(staging.size_bytes() >= META_WINDOW_BYTES);
        debug_assert!(tail_in.size_bytes() >= META_WINDOW_BYTES);
        Self {
            adapter,
            staging,
            tail_in,
            head_out,
        }
    }

    /// The upstream tail most recently landed here.
    pub fn fetch_tail(&self) -> u32 {
        cell_of(&self.tail_in).load()
    }

    /// Ship `head` to the upstream stage's head cell.
    pub async fn store_head(&self, head: u32) -> Result<(), TransferError> {
        cell_of(&self.staging).store(head);
        self.adapter
            .transfer(self.staging.clone(), self.head_out.clone())
            .await
    }
}
