//! sluice-adapter-mem: in-memory transfer adapters.
//!
//! Two [`Adapter`] implementations over plain process memory:
//!
//! - [`SharedRegionAdapter`] — source and destination windows designate
//!   the same region, so `transfer` completes without touching a byte.
//!   This is the shared-memory deployment shape.
//! - [`CopyAdapter`] — `transfer` copies the byte prefix from the source
//!   window into the destination window's region: a process-local stand-in
//!   for a one-sided remote write, with the same completion semantics.
//!
//! Both operate on [`MemWindow`]s over an [`MemRegion`], an `Arc`-shared
//! byte buffer. Regions hand out overlapping windows freely; which party
//! writes which range at which time is governed by the pipeline's ring
//! discipline, exactly as it would be for real shared memory.

#![forbid(unsafe_op_in_unsafe_fn)]

use std::cell::UnsafeCell;
use std::sync::Arc;

use sluice_pipeline::{Adapter, LocalWindow, RemoteWindow, TransferError};

struct RegionInner {
    /// Backing storage in u64 words, so 8-byte metadata cells carved at
    /// word-multiple offsets are naturally aligned.
    words: Box<[UnsafeCell<u64>]>,
    len: usize,
}

// SAFETY: concurrent access to disjoint byte ranges is coordinated by the
// pipeline counters, the same discipline a real shared-memory segment
// relies on.
unsafe impl Send for RegionInner {}
unsafe impl Sync for RegionInner {}

/// An `Arc`-shared byte region windows are carved out of.
#[derive(Clone)]
pub struct MemRegion {
    inner: Arc<RegionInner>,
}

impl MemRegion {
    /// Allocate a zero-filled region of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        let words = (0..len.div_ceil(8))
            .map(|_| UnsafeCell::new(0u64))
            .collect::<Box<[_]>>();
        Self {
            inner: Arc::new(RegionInner { words, len }),
        }
    }

    /// Region length in bytes.
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// A window over the whole region.
    pub fn window(&self) -> MemWindow {
        self.window_at(0, self.len())
    }

    /// A window over `len` bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics when the range exceeds the region.
    pub fn window_at(&self, offset: usize, len: usize) -> MemWindow {
        assert!(
            offset.checked_add(len).is_some_and(|end| end <= self.len()),
            "window {}..{} exceeds region of {} bytes",
            offset,
            offset + len,
            self.len()
        );
        MemWindow {
            region: self.clone(),
            offset,
            len,
        }
    }

    /// Copy `data` into the region starting at `offset`.
    ///
    /// A driver-side write; the caller coordinates with any in-flight
    /// transfers through the pipeline counters.
    pub fn write_bytes(&self, offset: usize, data: &[u8]) {
        let window = self.window_at(offset, data.len());
        // SAFETY: range checked by window_at; coordination is the
        // caller's contract.
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), window.data(), data.len()) };
    }

    /// Copy `len` bytes starting at `offset` out of the region.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        let window = self.window_at(offset, len);
        let mut out = vec![0u8; len];
        // SAFETY: range checked by window_at.
        unsafe { std::ptr::copy_nonoverlapping(window.data(), out.as_mut_ptr(), len) };
        out
    }
}

/// A byte window into a [`MemRegion`].
///
/// Serves as both the local and the remote handle type: "remote" here is
/// just another region in the same process.
#[derive(Clone)]
pub struct MemWindow {
    region: MemRegion,
    offset: usize,
    len: usize,
}

impl MemWindow {
    /// The region this window is carved out of.
    pub fn region(&self) -> &MemRegion {
        &self.region
    }

    /// Byte offset of this window within its region.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn sub(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset.checked_add(len).is_some_and(|end| end <= self.len),
            "slice {}..{} exceeds window of {} bytes",
            offset,
            offset + len,
            self.len
        );
        Self {
            region: self.region.clone(),
            offset: self.offset + offset,
            len,
        }
    }
}

impl LocalWindow for MemWindow {
    fn size_bytes(&self) -> usize {
        self.len
    }

    fn data(&self) -> *mut u8 {
        // UnsafeCell<u64> is transparent over u64; the word array is one
        // contiguous byte buffer.
        let base = self.region.inner.words.as_ptr() as *mut u8;
        base.wrapping_add(self.offset)
    }

    fn slice(&self, offset: usize, len: usize) -> Self {
        self.sub(offset, len)
    }
}

impl RemoteWindow for MemWindow {
    fn size_bytes(&self) -> usize {
        self.len
    }

    fn slice(&self, offset: usize, len: usize) -> Self {
        self.sub(offset, len)
    }
}

/// Adapter for windows that alias one shared region: nothing to move.
#[derive(Debug, Default, Clone)]
pub struct SharedRegionAdapter;

impl Adapter for SharedRegionAdapter {
    type Local = MemWindow;
    type Remote = MemWindow;

    fn transfer(
        &self,
        _src: MemWindow,
        _dst: MemWindow,
    ) -> impl std::future::Future<Output = Result<(), TransferError>> + Send {
        // Source and destination designate the same bytes.
        async { Ok(()) }
    }
}

/// Adapter that copies bytes between regions, like a one-sided remote
/// write completed locally.
#[derive(Debug, Default, Clone)]
pub struct CopyAdapter;

impl Adapter for CopyAdapter {
    type Local = MemWindow;
    type Remote = MemWindow;

    fn transfer(
        &self,
        src: MemWindow,
        dst: MemWindow,
    ) -> impl std::future::Future<Output = Result<(), TransferError>> + Send {
        async move {
            let len = LocalWindow::size_bytes(&src).min(RemoteWindow::size_bytes(&dst));
            // SAFETY: both windows were bounds-checked at creation; ranges
            // may belong to the same region, so use a memmove.
            unsafe { std::ptr::copy(src.data(), LocalWindow::data(&dst), len) };
            Ok(())
        }
    }
}

/// Adapter that fails every transfer; for exercising error paths.
#[derive(Debug, Default, Clone)]
pub struct FailingAdapter;

impl Adapter for FailingAdapter {
    type Local = MemWindow;
    type Remote = MemWindow;

    fn transfer(
        &self,
        _src: MemWindow,
        _dst: MemWindow,
    ) -> impl std::future::Future<Output = Result<(), TransferError>> + Send {
        async { Err(TransferError::adapter("transfer refused by test adapter")) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_adapter_moves_the_min_prefix() {
        let src_region = MemRegion::zeroed(8);
        let dst_region = MemRegion::zeroed(8);
        src_region.write_bytes(0, &[1, 2, 3, 4, 5, 6, 7, 8]);

        CopyAdapter
            .transfer(src_region.window(), dst_region.window_at(0, 4))
            .await
            .unwrap();

        assert_eq!(dst_region.read_bytes(0, 8), vec![1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn shared_region_adapter_is_a_completed_noop() {
        let region = MemRegion::zeroed(4);
        region.write_bytes(0, &[9, 9, 9, 9]);
        SharedRegionAdapter
            .transfer(region.window(), region.window())
            .await
            .unwrap();
        assert_eq!(region.read_bytes(0, 4), vec![9, 9, 9, 9]);
    }

    #[test]
    fn windows_slice_relative_to_their_offset() {
        let region = MemRegion::zeroed(16);
        region.write_bytes(0, &(0..16).collect::<Vec<u8>>());

        let window = region.window_at(4, 8);
        let inner = LocalWindow::slice(&window, 2, 3);
        assert_eq!(LocalWindow::size_bytes(&inner), 3);
        // offset 4 + 2 = 6 into the region
        let mut seen = vec![0u8; 3];
        unsafe { std::ptr::copy_nonoverlapping(inner.data(), seen.as_mut_ptr(), 3) };
        assert_eq!(seen, vec![6, 7, 8]);
    }

    #[test]
    #[should_panic(expected = "exceeds window")]
    fn slicing_past_the_window_panics() {
        let region = MemRegion::zeroed(8);
        let window = region.window_at(0, 4);
        let _ = LocalWindow::slice(&window, 2, 3);
    }
}
