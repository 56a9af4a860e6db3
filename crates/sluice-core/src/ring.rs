//! Generic SPSC ring buffer over any element type.

use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::Ordering;

use crate::policy::{Blocking, OverflowPolicy, PolicyKind};
use crate::raw::RawRing;

/// A single-producer / single-consumer ring buffer.
///
/// Elements are constructed in place on push and moved out on pop. The
/// overflow policy `P` decides what a push does when the ring is full; see
/// [`Blocking`](crate::Blocking), [`Dropping`](crate::Dropping) and
/// [`Overwriting`](crate::Overwriting).
///
/// The ring is a single shared object: clone an `Arc<Ring<..>>` and hand
/// one reference to the producer thread and one to the consumer thread.
/// The crate-level SPSC contract applies.
///
/// ```
/// use sluice_core::DroppingRing;
///
/// let ring = DroppingRing::new(4);
/// assert!(ring.try_push(1));
/// assert!(ring.try_push(2));
/// assert_eq!(ring.try_pop(), Some(1));
/// assert_eq!(ring.try_pop(), Some(2));
/// assert_eq!(ring.try_pop(), None);
/// ```
pub struct Ring<T, P: OverflowPolicy = Blocking> {
    raw: RawRing<T>,
    _policy: PhantomData<P>,
}

// SAFETY: see RawRing. The policy marker carries no data.
unsafe impl<T: Send, P: OverflowPolicy> Send for Ring<T, P> {}
unsafe impl<T: Send, P: OverflowPolicy> Sync for Ring<T, P> {}

impl<T, P: OverflowPolicy> Ring<T, P> {
    /// Create a ring with at least `capacity` slots.
    ///
    /// Capacity is rounded up to the next power of two; a request of 0
    /// yields a single slot. Storage is allocated once and never grows.
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

    /// Push an element.
    ///
    /// Behavior when full depends on the policy: `Blocking` spin-yields
    /// until space appears (always returns `true`), `Dropping` returns
    /// `false` and leaves the ring untouched, `Overwriting` evicts the
    /// oldest element first (always returns `true`).
    pub fn try_push(&self, value: T) -> bool {
        self.try_push_with(move || value)
    }

    /// Push an element produced by `make`, evaluated only once a slot is
    /// secured. The full-ring behavior matches [`try_push`](Self::try_push).
    pub fn try_push_with(&self, make: impl FnOnce() -> T) -> bool {
        match P::KIND {
            PolicyKind::Block => self.wait_for_space(),
            PolicyKind::Drop => {
                if self.producer_is_full() {
                    return false;
                }
            }
            PolicyKind::Overwrite => {
                if self.producer_is_full() {
                    self.evict_oldest();
                }
            }
        }
        let head = self.raw.head.load(Ordering::Relaxed);
        // SAFETY: the slot at `head` is free: the policy paths above
        // established `head - tail < capacity`, and only this producer
        // advances head.
        unsafe { ptr::write(self.raw.slot(head), make()) };
        self.raw.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Pop the oldest element, or `None` when empty.
    pub fn try_pop(&self) -> Option<T> {
        let tail = self.raw.tail.load(Ordering::Relaxed);
        if tail == self.raw.head.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: tail < head, so the slot at `tail` holds an initialized
        // element owned by the ring; reading it out transfers ownership
        // before the tail advance makes the slot reusable.
        let value = unsafe { ptr::read(self.raw.slot(tail)) };
        self.raw.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Borrow the oldest element without removing it.
    ///
    /// The reference is valid until the next consumer-side operation
    /// (`try_pop*`, `clear`); under the SPSC contract the producer cannot
    /// invalidate it.
    pub fn try_peek(&self) -> Option<&T> {
        let tail = self.raw.tail.load(Ordering::Acquire);
        if tail == self.raw.head.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: slot at tail is initialized (tail < head) and the
        // consumer party — the only one that may free it — is the caller.
        Some(unsafe { &*self.raw.slot(tail) })
    }

    /// Push elements from a slice, cloning each, until the policy refuses.
    ///
    /// Returns the number of elements pushed. Under `Blocking` this waits
    /// per element and always pushes the whole slice.
    pub fn try_push_bulk(&self, items: &[T]) -> usize
    where
        T: Clone,
    {
        let mut pushed = 0;
        for item in items {
            if !self.try_push(item.clone()) {
                break;
            }
            pushed += 1;
        }
        pushed
    }

    /// Pop elements into `out` until the ring is empty or `out` is full.
    ///
    /// Returns the number of elements written; each write drops the value
    /// previously in that slot of `out`.
    pub fn try_pop_bulk(&self, out: &mut [T]) -> usize {
        let mut popped = 0;
        for slot in out.iter_mut() {
            match self.try_pop() {
                Some(value) => {
                    *slot = value;
                    popped += 1;
                }
                None => break,
            }
        }
        popped
    }

    /// Drop every stored element in FIFO order and leave the ring empty.
    pub fn clear(&self) {
        while self.try_pop().is_some() {}
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

    /// Producer-side full check: the producer's own head is current, so a
    /// stale tail can only make the ring look fuller than it is.
    #[inline]
    fn producer_is_full(&self) -> bool {
        let head = self.raw.head.load(Ordering::Relaxed);
        let tail = self.raw.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) >= self.capacity() as u64
    }

    /// Spin until the consumer frees a slot.
    fn wait_for_space(&self) {
        while self.producer_is_full() {
            std::thread::yield_now();
        }
    }

    /// Drop the element at tail and advance it. Producer-side eviction for
    /// the overwrite policy; requires a quiescent consumer.
    fn evict_oldest(&self) {
        let tail = self.raw.tail.load(Ordering::Relaxed);
        // SAFETY: the ring is full, so the slot at tail is initialized.
        // The consumer is quiescent by the Overwriting contract, so no one
        // else reads or frees this slot concurrently.
        unsafe { ptr::drop_in_place(self.raw.slot(tail)) };
        self.raw.tail.store(tail.wrapping_add(1), Ordering::Release);
    }
}

impl<T, P: OverflowPolicy> Drop for Ring<T, P> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<T>() {
            return;
        }
        let head = self.raw.head.load(Ordering::Relaxed);
        let mut tail = self.raw.tail.load(Ordering::Relaxed);
        while tail != head {
            // SAFETY: slots in [tail, head) are initialized and exclusively
            // ours (we hold &mut self).
            unsafe { ptr::drop_in_place(self.raw.slot(tail)) };
            tail = tail.wrapping_add(1);
        }
    }
}

/// Counter snapshot of a ring.
#[derive(Debug, Clone, Copy)]
pub struct RingStatus {
    /// Producer's published head.
    pub head: u64,
    /// Consumer's published tail.
    pub tail: u64,
    /// Ring capacity.
    pub capacity: usize,
    /// Stored elements at snapshot time.
    pub len: usize,
}

impl std::fmt::Display for RingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "head={} tail={} len={}/{} ({}%)",
            self.head,
            self.tail,
            self.len,
            self.capacity,
            if self.capacity > 0 {
                self.len * 100 / self.capacity
            } else {
                0
            }
        )
    }
}
