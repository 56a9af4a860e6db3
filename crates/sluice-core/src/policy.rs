//! Overflow policies, selected at compile time.

mod sealed {
    pub trait Sealed {}
}

/// What a push does when the ring is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Spin-yield until the consumer frees a slot.
    Block,
    /// Refuse the push and return `false`.
    Drop,
    /// Evict the oldest element and push.
    Overwrite,
}

/// Compile-time overflow policy of a ring.
///
/// Sealed: the three policies below are the only implementations. Code
/// paths dispatch on [`OverflowPolicy::KIND`], which monomorphizes to a
/// single branch per instantiation.
pub trait OverflowPolicy: sealed::Sealed + 'static {
    const KIND: PolicyKind;
}

/// Block until space is available. `try_push` always returns `true`.
///
/// The wait is a pure spin with cooperative yields; there is no wake-up
/// source, so this policy only makes sense when a consumer is live.
#[derive(Debug)]
pub struct Blocking;

/// Drop the new element when full. `try_push` returns `false`.
#[derive(Debug)]
pub struct Dropping;

/// Overwrite the oldest element when full. `try_push` always returns
/// `true`.
///
/// Eviction advances the consumer counter from the producer's thread,
/// which breaks the strict producer/consumer role split. The consumer must
/// not run concurrently with pushes under this policy.
#[derive(Debug)]
pub struct Overwriting;

impl sealed::Sealed for Blocking {}
impl sealed::Sealed for Dropping {}
impl sealed::Sealed for Overwriting {}

impl OverflowPolicy for Blocking {
    const KIND: PolicyKind = PolicyKind::Block;
}
impl OverflowPolicy for Dropping {
    const KIND: PolicyKind = PolicyKind::Drop;
}
impl OverflowPolicy for Overwriting {
    const KIND: PolicyKind = PolicyKind::Overwrite;
}
