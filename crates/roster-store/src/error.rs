/// Errors from shared store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store's lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),

    /// A list referenced a key the store no longer holds.
    #[error("missing store entry for key {key}")]
    MissingEntry { key: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
