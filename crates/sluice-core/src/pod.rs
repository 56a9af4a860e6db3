//! SPSC ring buffer specialized for `Copy` element types.

use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::atomic::Ordering;

use crate::error::RingError;
use crate::policy::{Blocking, OverflowPolicy, PolicyKind};
use crate::raw::RawRing;
use crate::ring::RingStatus;
use crate::view::{ReadView, Segment, SplitWriteView, WriteView};
use crate::FixedVec;

/// A single-producer / single-consumer ring buffer for `Copy` elements.
///
/// Semantics match [`Ring`](crate::Ring), with the fast paths a trivially
/// copyable element type allows:
///
/// - bulk push and pop decompose into at most two contiguous byte copies
///   across the wrap and publish the whole batch with one release store;
/// - [`clear`](Self::clear) is a bare counter store, no per-element work;
/// - the stored and free regions can be borrowed directly as
///   [`ReadView`]s and [`WriteView`]s, so data is produced and consumed in
///   place.
///
/// ```
/// use sluice_core::PodBlockingRing;
///
/// let ring: PodBlockingRing<i32> = PodBlockingRing::new(16);
/// assert_eq!(ring.try_push_bulk(&[1, 2, 3, 4, 5]), 5);
///
/// let mut out = [0; 3];
/// assert_eq!(ring.try_pop_bulk(&mut out), 3);
/// assert_eq!(out, [1, 2, 3]);
/// ```
pub struct PodRing<T: Copy, P: OverflowPolicy = Blocking> {
    raw: RawRing<T>,
    _policy: PhantomData<P>,
}

// SAFETY: see RawRing; Copy elements carry no drop obligations.
unsafe impl<T: Copy + Send, P: OverflowPolicy> Send for PodRing<T, P> {}
unsafe impl<T: Copy + Send, P: OverflowPolicy> Sync for PodRing<T, P> {}

impl<T: Copy, P: OverflowPolicy> PodRing<T, P> {
    /// Create a ring with at least `capacity` slots (rounded up to a power
    /// of two, minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            raw: RawRing::new(capacity),
            _policy: PhantomData,
        }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Number of stored elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Whether the ring holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the ring is at capacity.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Number of free slots.
    #[inline]
    pub fn available(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Push an element; full-ring behavior per the policy, as on
    /// [`Ring::try_push`](crate::Ring::try_push).
    pub fn try_push(&self, value: T) -> bool {
        match P::KIND {
            PolicyKind::Block => self.wait_for_space(),
            PolicyKind::Drop => {
                if self.producer_is_full() {
                    return false;
                }
            }
            PolicyKind::Overwrite => {
                if self.producer_is_full() {
                    // Evict by advancing tail; no destructor to run.
                    let tail = self.raw.tail.load(Ordering::Relaxed);
                    self.raw.tail.store(tail.wrapping_add(1), Ordering::Release);
                }
            }
        }
        let head = self.raw.head.load(Ordering::Relaxed);
        // SAFETY: a free slot at `head` was secured above and only this
        // producer advances head.
        unsafe { ptr::write(self.raw.slot(head), value) };
        self.raw.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Pop the oldest element, or `None` when empty.
    pub fn try_pop(&self) -> Option<T> {
        let tail = self.raw.tail.load(Ordering::Relaxed);
        if tail == self.raw.head.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: tail < head, so the slot holds a published element.
        let value = unsafe { ptr::read(self.raw.slot(tail)) };
        self.raw.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Borrow the oldest element without removing it. Valid until the next
    /// consumer-side operation.
    pub fn try_peek(&self) -> Option<&T> {
        let tail = self.raw.tail.load(Ordering::Acquire);
        if tail == self.raw.head.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: slot at tail is published and only the calling consumer
        // can retire it.
        Some(unsafe { &*self.raw.slot(tail) })
    }

    /// Copy as many elements of `items` as fit, publishing the batch with
    /// a single release store. Returns the number copied.
    pub fn try_push_bulk(&self, items: &[T]) -> usize {
        let head = self.raw.head.load(Ordering::Relaxed);
        let tail = self.raw.tail.load(Ordering::Acquire);
        let available = self.capacity() - head.wrapping_sub(tail) as usize;
        let n = items.len().min(available);
        if n == 0 {
            return 0;
        }

        let start = self.raw.index_of(head);
        let first = n.min(self.capacity() - start);
        // SAFETY: [start, start + first) and [0, n - first) are free slots
        // (inside [head, tail + capacity)), disjoint from `items`.
        unsafe {
            ptr::copy_nonoverlapping(items.as_ptr(), self.raw.slot_at(start), first);
            ptr::copy_nonoverlapping(items.as_ptr().add(first), self.raw.slot_at(0), n - first);
        }

        self.raw
            .head
            .store(head.wrapping_add(n as u64), Ordering::Release);
        n
    }

    /// Copy up to `out.len()` stored elements into `out`, publishing the
    /// batch with a single release store. Returns the number copied.
    pub fn try_pop_bulk(&self, out: &mut [T]) -> usize {
        let tail = self.raw.tail.load(Ordering::Relaxed);
        let head = self.raw.head.load(Ordering::Acquire);
        let stored = head.wrapping_sub(tail) as usize;
        let n = out.len().min(stored);
        if n == 0 {
            return 0;
        }

        let start = self.raw.index_of(tail);
        let first = n.min(self.capacity() - start);
        // SAFETY: [start, start + first) and [0, n - first) are published
        // slots, disjoint from `out`.
        unsafe {
            ptr::copy_nonoverlapping(self.raw.slot_at(start), out.as_mut_ptr(), first);
            ptr::copy_nonoverlapping(self.raw.slot_at(0), out.as_mut_ptr().add(first), n - first);
        }

        self.raw
            .tail
            .store(tail.wrapping_add(n as u64), Ordering::Release);
        n
    }

    /// Discard all stored elements. A bare counter store; slots revert to
    /// uninitialized.
    pub fn clear(&self) {
        let head = self.raw.head.load(Ordering::Relaxed);
        self.raw.tail.store(head, Ordering::Release);
    }

    /// Snapshot of the counters, for diagnostics.
    pub fn status(&self) -> RingStatus {
        let tail = self.raw.tail.load(Ordering::Acquire);
        let head = self.raw.head.load(Ordering::Acquire);
        RingStatus {
            head,
            tail,
            capacity: self.capacity(),
            len: head.saturating_sub(tail) as usize,
        }
    }

    // ========================================================================
    // Zero-copy surface
    // ========================================================================

    /// Borrow the longest contiguous run of stored elements, capped at
    /// `max` (pass `usize::MAX` for no cap). Empty iff the ring is empty.
    pub fn read_view(&self, max: usize) -> ReadView<'_, T> {
        let tail = self.raw.tail.load(Ordering::Relaxed);
        let head = self.raw.head.load(Ordering::Acquire);
        let stored = head.wrapping_sub(tail) as usize;
        if stored == 0 {
            return ReadView::empty();
        }

        let start = self.raw.index_of(tail);
        let n = max.min(stored).min(self.capacity() - start);
        // SAFETY: n published slots starting at `start` are contiguous and
        // stay valid until the consumer advances past them.
        ReadView::new(unsafe { std::slice::from_raw_parts(self.raw.slot_at(start), n) })
    }

    /// Borrow up to `min(max, len)` stored elements as one or two views;
    /// the second covers the wrapped part and is empty when there is no
    /// split.
    pub fn read_views(&self, max: usize) -> [ReadView<'_, T>; 2] {
        let tail = self.raw.tail.load(Ordering::Relaxed);
        let head = self.raw.head.load(Ordering::Acquire);
        let stored = head.wrapping_sub(tail) as usize;
        let n = max.min(stored);
        if n == 0 {
            return [ReadView::empty(), ReadView::empty()];
        }

        let start = self.raw.index_of(tail);
        let first = n.min(self.capacity() - start);
        // SAFETY: as in read_view; the second range covers the wrapped
        // prefix of storage.
        unsafe {
            [
                ReadView::new(std::slice::from_raw_parts(self.raw.slot_at(start), first)),
                ReadView::new(std::slice::from_raw_parts(self.raw.slot_at(0), n - first)),
            ]
        }
    }

    /// Retire `count` elements consumed through read views.
    ///
    /// Fails with [`RingError::AdvanceOverflow`] when `count` exceeds the
    /// stored element count; the cursor is untouched on failure.
    pub fn advance_read(&self, count: usize) -> Result<(), RingError> {
        let stored = self.len();
        if count > stored {
            return Err(RingError::AdvanceOverflow {
                requested: count,
                available: stored,
            });
        }
        let tail = self.raw.tail.load(Ordering::Relaxed);
        self.raw
            .tail
            .store(tail.wrapping_add(count as u64), Ordering::Release);
        Ok(())
    }

    /// Borrow the longest contiguous run of free slots for writing, capped
    /// at `max`. The view is empty when the ring is full.
    pub fn write_view(&self, max: usize) -> WriteView<'_, T> {
        let head = self.raw.head.load(Ordering::Relaxed);
        let tail = self.raw.tail.load(Ordering::Acquire);
        let available = self.capacity() - head.wrapping_sub(tail) as usize;

        let start = self.raw.index_of(head);
        let n = max.min(available).min(self.capacity() - start);
        // SAFETY: n free slots starting at `start` are contiguous; the
        // consumer cannot touch them until the view commits.
        let data = unsafe { std::slice::from_raw_parts_mut(self.raw.slot_at(start), n) };
        WriteView::new(data, &self.raw.head, head)
    }

    /// Borrow up to `min(max, available)` free slots as one or two runs
    /// (the second covers the wrap), committed as a single head advance.
    pub fn split_write_view(&self, max: usize) -> SplitWriteView<'_, T> {
        let head = self.raw.head.load(Ordering::Relaxed);
        let tail = self.raw.tail.load(Ordering::Acquire);
        let available = self.capacity() - head.wrapping_sub(tail) as usize;
        let n = max.min(available);

        let mut segments: FixedVec<Segment<'_, T>, 2> = FixedVec::new();
        if n > 0 {
            let start = self.raw.index_of(head);
            let first = n.min(self.capacity() - start);
            // SAFETY: the two ranges partition n free slots; the consumer
            // cannot touch them until the view commits.
            unsafe {
                segments.push(Segment::new(std::slice::from_raw_parts_mut(
                    self.raw.slot_at(start),
                    first,
                )));
                if n > first {
                    segments.push(Segment::new(std::slice::from_raw_parts_mut(
                        self.raw.slot_at(0),
                        n - first,
                    )));
                }
            }
        }
        SplitWriteView::new(segments, &self.raw.head, head)
    }

    /// Advance head by `count` immediately and return a pointer to the
    /// first reserved slot.
    ///
    /// Fails with [`RingError::InsufficientSpace`] when `count` exceeds
    /// the free space.
    ///
    /// # Safety
    ///
    /// The reservation is published before the slots are filled: the
    /// caller must write all `count` elements before the consumer can
    /// observe them, and must handle the wrap at the storage boundary
    /// (the run may not be contiguous past `capacity - (head & mask)`
    /// elements).
    pub unsafe fn reserve_write_space(&self, count: usize) -> Result<NonNull<T>, RingError> {
        let head = self.raw.head.load(Ordering::Relaxed);
        let tail = self.raw.tail.load(Ordering::Acquire);
        let available = self.capacity() - head.wrapping_sub(tail) as usize;
        if count > available {
            return Err(RingError::InsufficientSpace {
                requested: count,
                available,
            });
        }

        let ptr = self.raw.slot(head);
        self.raw
            .head
            .store(head.wrapping_add(count as u64), Ordering::Release);
        // SAFETY: slot pointers are always in bounds and non-null.
        Ok(unsafe { NonNull::new_unchecked(ptr) })
    }

    #[inline]
    fn producer_is_full(&self) -> bool {
        let head = self.raw.head.load(Ordering::Relaxed);
        let tail = self.raw.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) >= self.capacity() as u64
    }

    fn wait_for_space(&self) {
        while self.producer_is_full() {
            std::thread::yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{PodBlockingRing, PodDroppingRing, PodOverwritingRing, RingError};

    #[test]
    fn bulk_push_then_partial_pop() {
        let ring: PodBlockingRing<i32> = PodBlockingRing::new(16);
        assert_eq!(ring.try_push_bulk(&[1, 2, 3, 4, 5]), 5);

        let mut out = [0; 3];
        assert_eq!(ring.try_pop_bulk(&mut out), 3);
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn bulk_ops_cross_the_wrap() {
        let ring: PodBlockingRing<u32> = PodBlockingRing::new(8);
        assert_eq!(ring.try_push_bulk(&[1, 2, 3, 4, 5, 6, 7, 8]), 8);

        let mut out = [0u32; 5];
        assert_eq!(ring.try_pop_bulk(&mut out), 5);
        assert_eq!(out, [1, 2, 3, 4, 5]);

        // Next batch lands across the storage boundary.
        assert_eq!(ring.try_push_bulk(&[9, 10, 11, 12, 13]), 5);
        let mut rest = [0u32; 8];
        assert_eq!(ring.try_pop_bulk(&mut rest), 8);
        assert_eq!(rest, [6, 7, 8, 9, 10, 11, 12, 13]);
    }

    #[test]
    fn bulk_push_respects_available_space() {
        let ring: PodDroppingRing<u8> = PodDroppingRing::new(4);
        assert_eq!(ring.try_push_bulk(&[1, 2, 3]), 3);
        assert_eq!(ring.try_push_bulk(&[4, 5, 6]), 1);
        assert_eq!(ring.try_push_bulk(&[7]), 0);
    }

    #[test]
    fn single_element_policies_match_generic_ring() {
        let dropping: PodDroppingRing<i32> = PodDroppingRing::new(2);
        assert!(dropping.try_push(1));
        assert!(dropping.try_push(2));
        assert!(!dropping.try_push(3));

        let overwriting: PodOverwritingRing<i32> = PodOverwritingRing::new(2);
        assert!(overwriting.try_push(1));
        assert!(overwriting.try_push(2));
        assert!(overwriting.try_push(3));
        assert_eq!(overwriting.try_pop(), Some(2));
        assert_eq!(overwriting.try_pop(), Some(3));
    }

    #[test]
    fn clear_is_counter_only() {
        let ring: PodBlockingRing<u64> = PodBlockingRing::new(8);
        ring.try_push_bulk(&[1, 2, 3]);
        ring.clear();
        assert!(ring.is_empty());
        let status = ring.status();
        assert_eq!(status.head, status.tail);
        assert_eq!(status.head, 3);
    }

    #[test]
    fn read_view_is_byte_exact() {
        let ring: PodBlockingRing<u32> = PodBlockingRing::new(8);
        ring.try_push_bulk(&[0xDEAD_BEEF, 0xCAFE_F00D, 7]);

        let view = ring.read_view(usize::MAX);
        assert_eq!(view.as_slice(), &[0xDEAD_BEEF, 0xCAFE_F00D, 7]);
        assert_eq!(view[0], 0xDEAD_BEEF);
        assert_eq!(view.get(3), None);

        // Borrowing does not consume.
        assert_eq!(ring.len(), 3);
        ring.advance_read(view.len()).unwrap();
        assert!(ring.is_empty());
    }

    #[test]
    fn read_views_split_on_wrap() {
        let ring: PodBlockingRing<i32> = PodBlockingRing::new(8);
        ring.try_push_bulk(&[0, 1, 2, 3, 4, 5]);
        let mut out = [0; 3];
        ring.try_pop_bulk(&mut out);
        ring.try_push_bulk(&[6, 7, 8, 9, 10]);

        let [first, second] = ring.read_views(usize::MAX);
        assert_eq!(first.len() + second.len(), 8);
        assert!(!second.is_empty(), "stored region must wrap here");
        let combined: Vec<i32> = first.iter().chain(second.iter()).copied().collect();
        assert_eq!(combined, vec![3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn read_view_respects_cap() {
        let ring: PodBlockingRing<i32> = PodBlockingRing::new(8);
        ring.try_push_bulk(&[1, 2, 3, 4, 5]);
        assert_eq!(ring.read_view(2).len(), 2);
        let [a, b] = ring.read_views(3);
        assert_eq!(a.len() + b.len(), 3);
    }

    #[test]
    fn advance_read_overflow_is_rejected() {
        let ring: PodBlockingRing<i32> = PodBlockingRing::new(8);
        ring.try_push_bulk(&[1, 2]);
        assert_eq!(
            ring.advance_read(3),
            Err(RingError::AdvanceOverflow {
                requested: 3,
                available: 2,
            })
        );
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn write_view_commit_publishes() {
        let ring: PodBlockingRing<i32> = PodBlockingRing::new(8);
        {
            let mut view = ring.write_view(5);
            assert_eq!(view.capacity(), 5);
            let written = view.write(&[100, 101, 102]);
            assert_eq!(written, 3);
            view.commit(written).unwrap();
            assert!(view.is_committed());
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.try_pop(), Some(100));
        assert_eq!(ring.try_pop(), Some(101));
        assert_eq!(ring.try_pop(), Some(102));
    }

    #[test]
    fn uncommitted_write_view_exposes_nothing() {
        let ring: PodBlockingRing<i32> = PodBlockingRing::new(8);
        {
            let mut view = ring.write_view(4);
            view.as_mut_slice()[0] = 42;
            // dropped without commit
        }
        assert!(ring.is_empty());
        assert_eq!(ring.status().head, 0);
    }

    #[test]
    fn write_view_survives_panic_without_exposing_slots() {
        let ring = Arc::new(PodBlockingRing::<i32>::new(8));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe({
            let ring = Arc::clone(&ring);
            move || {
                let mut view = ring.write_view(4);
                view.as_mut_slice()[0] = 1;
                panic!("boom before commit");
            }
        }));
        assert!(result.is_err());
        assert!(ring.is_empty());
    }

    #[test]
    fn write_view_commit_overflow_is_rejected() {
        let ring: PodBlockingRing<i32> = PodBlockingRing::new(4);
        let mut view = ring.write_view(usize::MAX);
        assert_eq!(view.capacity(), 4);
        assert_eq!(
            view.commit(5),
            Err(RingError::CommitOverflow {
                requested: 5,
                capacity: 4,
            })
        );
        assert!(!view.is_committed());
        view.commit(2).unwrap();
        drop(view);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn split_write_view_covers_the_wrap() {
        let ring: PodBlockingRing<i32> = PodBlockingRing::new(8);
        ring.try_push_bulk(&[0, 1, 2, 3, 4, 5]);
        let mut out = [0; 3];
        ring.try_pop_bulk(&mut out);
        // head=6, tail=3: free region is [6,8) plus [0,3).

        {
            let mut view = ring.split_write_view(5);
            assert_eq!(view.segment_count(), 2);
            assert_eq!(view.total_capacity(), 5);
            let written = view.write(&[100, 101, 102, 103, 104]);
            assert_eq!(written, 5);
            view.commit(written).unwrap();
        }

        assert_eq!(ring.len(), 8);
        let mut all = [0; 8];
        assert_eq!(ring.try_pop_bulk(&mut all), 8);
        assert_eq!(all, [3, 4, 5, 100, 101, 102, 103, 104]);
    }

    #[test]
    fn split_write_view_iterates_in_logical_order() {
        let ring: PodBlockingRing<u8> = PodBlockingRing::new(4);
        ring.try_push_bulk(&[1, 2, 3]);
        let mut out = [0; 2];
        ring.try_pop_bulk(&mut out);
        // head=3, tail=2: writing 3 slots wraps after the first.

        let mut view = ring.split_write_view(3);
        assert_eq!(view.segment_count(), 2);
        for (i, slot) in view.iter_mut().enumerate() {
            *slot = 10 + i as u8;
        }
        view.commit(3).unwrap();
        drop(view);

        let mut all = [0; 4];
        assert_eq!(ring.try_pop_bulk(&mut all), 4);
        assert_eq!(all, [3, 10, 11, 12]);
    }

    #[test]
    fn split_write_view_empty_when_full() {
        let ring: PodBlockingRing<u8> = PodBlockingRing::new(2);
        ring.try_push_bulk(&[1, 2]);
        let view = ring.split_write_view(usize::MAX);
        assert!(view.is_empty());
        assert_eq!(view.segment_count(), 0);
    }

    #[test]
    fn reserve_write_space_advances_immediately() {
        let ring: PodBlockingRing<u32> = PodBlockingRing::new(8);
        // SAFETY: the reserved run is filled below before any pop, and 4
        // slots from index 0 do not wrap.
        let ptr = unsafe { ring.reserve_write_space(4) }.unwrap();
        assert_eq!(ring.len(), 4);
        unsafe {
            for i in 0..4 {
                ptr.as_ptr().add(i).write(i as u32 * 11);
            }
        }
        let mut out = [0u32; 4];
        assert_eq!(ring.try_pop_bulk(&mut out), 4);
        assert_eq!(out, [0, 11, 22, 33]);
    }

    #[test]
    fn reserve_write_space_rejects_oversized_requests() {
        let ring: PodBlockingRing<u32> = PodBlockingRing::new(4);
        ring.try_push_bulk(&[1, 2, 3]);
        let err = unsafe { ring.reserve_write_space(2) }.unwrap_err();
        assert_eq!(
            err,
            RingError::InsufficientSpace {
                requested: 2,
                available: 1,
            }
        );
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn round_trip_bulk_sequences() {
        let ring: PodBlockingRing<u16> = PodBlockingRing::new(32);
        let mut expected = Vec::new();
        let mut received = Vec::new();
        for chunk in 0..40u16 {
            let batch: Vec<u16> = (chunk * 3..chunk * 3 + 3).collect();
            assert_eq!(ring.try_push_bulk(&batch), 3);
            expected.extend_from_slice(&batch);

            let mut out = [0u16; 3];
            assert_eq!(ring.try_pop_bulk(&mut out), 3);
            received.extend_from_slice(&out);
        }
        assert_eq!(received, expected);
    }
}
