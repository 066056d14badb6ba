use anchor_types::RecordId;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record with this identifier already exists.
    #[error("duplicate record identifier: {0}")]
    Duplicate(RecordId),

    /// The backend could not be reached or failed the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
