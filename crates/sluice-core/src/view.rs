//! Borrowed views into ring storage.
//!
//! Read views are immutable spans over the stored region. Write views are
//! mutable spans over free slots with deferred commit: nothing becomes
//! visible to the consumer until [`WriteView::commit`] publishes the head
//! advance, and dropping an uncommitted view publishes a zero-length commit
//! so a panic between acquisition and commit can never expose
//! uninitialized slots.
//!
//! All views borrow the ring. While a read view is alive the consumer must
//! not pop or advance the read cursor; while a write view is alive the
//! producer must not push or reserve. The SPSC contract already bars the
//! peer party from those operations.

use std::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::FixedVec;
use crate::error::RingError;

/// Immutable borrowed span over stored elements.
///
/// Obtained from [`PodRing::read_view`](crate::PodRing::read_view) and
/// [`PodRing::read_views`](crate::PodRing::read_views). Consuming the data
/// is a separate step: call
/// [`PodRing::advance_read`](crate::PodRing::advance_read) after the bytes
/// have been processed.
#[derive(Debug)]
pub struct ReadView<'a, T> {
    data: &'a [T],
}

impl<'a, T> ReadView<'a, T> {
    #[inline]
    pub(crate) fn new(data: &'a [T]) -> Self {
        Self { data }
    }

    /// An empty view.
    #[inline]
    pub(crate) fn empty() -> Self {
        Self { data: &[] }
    }

    /// Number of elements covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the view covers no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The covered elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Borrow the element at `index`, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Iterate over the covered elements.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'a, T> {
        self.data.iter()
    }
}

impl<T> Index<usize> for ReadView<'_, T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<'a, T> IntoIterator for &'a ReadView<'a, T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

/// Shared commit plumbing: the head counter borrowed from the ring plus
/// the counter value captured when the view was created.
struct Committer<'a> {
    head: &'a AtomicU64,
    base: u64,
    committed: bool,
}

impl Committer<'_> {
    /// Publish `base + written` as the new head.
    fn publish(&mut self, written: usize) {
        self.head
            .store(self.base.wrapping_add(written as u64), Ordering::Release);
        self.committed = true;
    }
}

/// Mutable borrowed span over a single contiguous run of free slots.
///
/// Move-only. Fill (part of) the span, then call
/// [`commit`](WriteView::commit) with the number of elements actually
/// written; only then do they become visible to the consumer. Dropping the
/// view without committing publishes a commit of zero elements.
pub struct WriteView<'a, T> {
    data: &'a mut [T],
    committer: Committer<'a>,
}

impl<'a, T: Copy> WriteView<'a, T> {
    pub(crate) fn new(data: &'a mut [T], head: &'a AtomicU64, base: u64) -> Self {
        Self {
            data,
            committer: Committer {
                head,
                base,
                committed: false,
            },
        }
    }

    /// Number of slots reserved for writing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Whether the view holds no writable slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The writable slots as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
    }

    /// Copy elements from `source` into the front of the view.
    ///
    /// Returns the number of elements copied
    /// (`min(source.len(), capacity)`). Does not commit.
    pub fn write(&mut self, source: &[T]) -> usize {
        let n = source.len().min(self.data.len());
        self.data[..n].copy_from_slice(&source[..n]);
        n
    }

    /// Publish `written` elements to the consumer.
    ///
    /// Fails with [`RingError::CommitOverflow`] when `written` exceeds the
    /// view capacity, leaving the view and ring untouched. A second commit
    /// after a successful one is a no-op.
    pub fn commit(&mut self, written: usize) -> Result<(), RingError> {
        if self.committer.committed {
            return Ok(());
        }
        if written > self.data.len() {
            return Err(RingError::CommitOverflow {
                requested: written,
                capacity: self.data.len(),
            });
        }
        self.committer.publish(written);
        Ok(())
    }

    /// Whether a commit has been published.
    #[inline]
    pub fn is_committed(&self) -> bool {
        self.committer.committed
    }
}

impl<T> Drop for WriteView<'_, T> {
    fn drop(&mut self) {
        if !self.committer.committed {
            self.committer.publish(0);
        }
    }
}

/// One contiguous run of writable slots inside a [`SplitWriteView`].
pub struct Segment<'a, T> {
    data: &'a mut [T],
}

impl<'a, T> Segment<'a, T> {
    #[inline]
    pub(crate) fn new(data: &'a mut [T]) -> Self {
        Self { data }
    }

    /// Number of slots in this run.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the run is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The run as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
    }
}

/// Mutable borrowed view over up to two contiguous runs of free slots.
///
/// When the free region wraps the end of storage, a single contiguous view
/// cannot cover it; this view carries both runs and presents them in
/// logical (producer) order. Commit semantics match [`WriteView`]: one
/// head advance covering however many elements were written, zero on drop
/// without commit.
pub struct SplitWriteView<'a, T> {
    segments: FixedVec<Segment<'a, T>, 2>,
    committer: Committer<'a>,
}

impl<'a, T: Copy> SplitWriteView<'a, T> {
    pub(crate) fn new(
        segments: FixedVec<Segment<'a, T>, 2>,
        head: &'a AtomicU64,
        base: u64,
    ) -> Self {
        Self {
            segments,
            committer: Committer {
                head,
                base,
                committed: false,
            },
        }
    }

    /// Total writable slots across both runs.
    pub fn total_capacity(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    /// Number of runs (0, 1 or 2).
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Whether the view holds no writable slots.
    pub fn is_empty(&self) -> bool {
        self.total_capacity() == 0
    }

    /// Both runs as mutable slices, in logical order. Missing runs come
    /// back empty.
    pub fn as_mut_slices(&mut self) -> (&mut [T], &mut [T]) {
        match self.segments.as_mut_slice() {
            [] => (&mut [], &mut []),
            [first] => (&mut *first.data, &mut []),
            [first, second, ..] => (&mut *first.data, &mut *second.data),
        }
    }

    /// Mutably borrow the run at `index`.
    pub fn segment_mut(&mut self, index: usize) -> Option<&mut Segment<'a, T>> {
        self.segments.get_mut(index)
    }

    /// Copy elements from `source` across the runs in logical order.
    ///
    /// Returns the number of elements copied
    /// (`min(source.len(), total_capacity)`). Does not commit.
    pub fn write(&mut self, source: &[T]) -> usize {
        let mut offset = 0;
        for segment in self.segments.iter_mut() {
            if offset == source.len() {
                break;
            }
            let n = (source.len() - offset).min(segment.data.len());
            segment.data[..n].copy_from_slice(&source[offset..offset + n]);
            offset += n;
        }
        offset
    }

    /// Iterate mutably over every writable slot in logical order, stepping
    /// from the first run into the second when the first is exhausted.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        let (first, second) = self.as_mut_slices();
        first.iter_mut().chain(second.iter_mut())
    }

    /// Publish `written` elements to the consumer as one head advance.
    ///
    /// Fails with [`RingError::CommitOverflow`] when `written` exceeds the
    /// total capacity. A second commit after a successful one is a no-op.
    pub fn commit(&mut self, written: usize) -> Result<(), RingError> {
        if self.committer.committed {
            return Ok(());
        }
        let capacity = self.total_capacity();
        if written > capacity {
            return Err(RingError::CommitOverflow {
                requested: written,
                capacity,
            });
        }
        self.committer.publish(written);
        Ok(())
    }

    /// Whether a commit has been published.
    #[inline]
    pub fn is_committed(&self) -> bool {
        self.committer.committed
    }
}

impl<T> Drop for SplitWriteView<'_, T> {
    fn drop(&mut self) {
        if !self.committer.committed {
            self.committer.publish(0);
        }
    }
}
