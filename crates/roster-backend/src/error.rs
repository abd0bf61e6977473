//! Error types for list and backend operations.

use roster_store::StoreError;

/// Errors that can occur while reading or mutating a list.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// A position was outside the list.
    #[error("index {index} out of range for list of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// A range reached past the end of the list.
    #[error("range {start}..{end} out of bounds for list of length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    /// Caller-supplied data broke a key invariant.
    #[error("contract violation: {reason}")]
    ContractViolation { reason: String },

    /// The shared store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for list results.
pub type ListResult<T> = Result<T, ListError>;

/// Fails unless `index` names an existing position.
pub(crate) fn check_index(index: usize, len: usize) -> ListResult<()> {
    if index >= len {
        return Err(ListError::OutOfRange { index, len });
    }
    Ok(())
}

/// Fails unless `index` is a valid insertion point (`0..=len`).
pub(crate) fn check_insert(index: usize, len: usize) -> ListResult<()> {
    if index > len {
        return Err(ListError::OutOfRange { index, len });
    }
    Ok(())
}

/// Fails unless `start..end` lies within `0..len`.
pub(crate) fn check_range(start: usize, end: usize, len: usize) -> ListResult<()> {
    if start > end || end > len {
        return Err(ListError::RangeOutOfBounds { start, end, len });
    }
    Ok(())
}
