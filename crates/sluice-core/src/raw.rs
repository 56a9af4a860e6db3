//! Shared storage and counter core for both ring flavors.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Backing storage plus the two published counters.
///
/// Counters are unbounded 64-bit values; the physical slot of a counter
/// value is `counter & mask`. Head and tail each occupy their own cache
/// line so the producer and consumer never write to the same line.
pub(crate) struct RawRing<T> {
    capacity: usize,
    mask: u64,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    pub(crate) head: CachePadded<AtomicU64>,
    pub(crate) tail: CachePadded<AtomicU64>,
}

impl<T> RawRing<T> {
    /// Allocate storage for at least `capacity` slots, rounded up to the
    /// next power of two (a request of 0 allocates a single slot).
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two().max(1);
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Box<[_]>>();
        Self {
            capacity,
            mask: capacity as u64 - 1,
            slots,
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Physical slot index of a counter value.
    #[inline]
    pub(crate) fn index_of(&self, counter: u64) -> usize {
        (counter & self.mask) as usize
    }

    /// Pointer to the slot a counter value maps to.
    ///
    /// The pointer is always in bounds; whether the slot holds an
    /// initialized `T` is governed by the `[tail, head)` invariant and is
    /// the caller's concern.
    #[inline]
    pub(crate) fn slot(&self, counter: u64) -> *mut T {
        self.slot_at(self.index_of(counter))
    }

    /// Pointer to the slot at a physical index (`index < capacity`).
    #[inline]
    pub(crate) fn slot_at(&self, index: usize) -> *mut T {
        debug_assert!(index < self.capacity);
        self.slots[index].get().cast::<T>()
    }

    /// Number of stored elements.
    ///
    /// Loads tail before head so a concurrent pop can only make the result
    /// an underestimate, never an underflow.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.saturating_sub(tail) as usize
    }
}

// SAFETY: RawRing hands out raw slot pointers; the wrapping ring types
// uphold the SPSC discipline that makes concurrent access to disjoint
// slots sound. Moving a ring between threads is safe whenever the elements
// are.
unsafe impl<T: Send> Send for RawRing<T> {}
unsafe impl<T: Send> Sync for RawRing<T> {}
