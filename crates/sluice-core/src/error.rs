//! Error types for ring and view operations.

/// Errors from checked ring and view operations.
///
/// Full and empty conditions are not errors: `try_push` reports a full
/// dropping ring by returning `false`, and `try_pop` / `try_peek` report an
/// empty ring with `None`. `RingError` covers the out-of-range cases where
/// a caller asked for more than the ring can give; the ring is left in its
/// prior state in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// `advance_read(n)` with `n` greater than the number of stored elements.
    AdvanceOverflow { requested: usize, available: usize },
    /// `commit(n)` with `n` greater than the view's capacity.
    CommitOverflow { requested: usize, capacity: usize },
    /// `reserve_write_space(n)` with `n` greater than the free space.
    InsufficientSpace { requested: usize, available: usize },
}

impl std::fmt::Display for RingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdvanceOverflow {
                requested,
                available,
            } => write!(
                f,
                "cannot advance read cursor by {} past {} stored elements",
                requested, available
            ),
            Self::CommitOverflow {
                requested,
                capacity,
            } => write!(
                f,
                "cannot commit {} elements into a view of capacity {}",
                requested, capacity
            ),
            Self::InsufficientSpace {
                requested,
                available,
            } => write!(
                f,
                "cannot reserve {} slots with only {} available",
                requested, available
            ),
        }
    }
}

impl std::error::Error for RingError {}
