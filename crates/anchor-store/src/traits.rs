use async_trait::async_trait;

use anchor_types::{Record, RecordFields, RecordId};

use crate::error::StoreResult;

/// Mutable record store.
///
/// Implementations must satisfy:
/// - `insert` assigns a fresh identifier that is never reused.
/// - `find` returns the current version of a record, which may differ from
///   the version that was anchored.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new record and return its store-assigned identifier.
    async fn insert(&self, fields: RecordFields) -> StoreResult<RecordId>;

    /// Insert a record under a caller-chosen identifier.
    ///
    /// Fails with [`StoreError::Duplicate`](crate::StoreError::Duplicate) if
    /// the identifier is taken.
    async fn insert_record(&self, record: Record) -> StoreResult<()>;

    /// Find a record by identifier. Returns `Ok(None)` if absent.
    async fn find(&self, id: &RecordId) -> StoreResult<Option<Record>>;

    /// Overwrite the fields of an existing record in place.
    ///
    /// Returns `false` if the record does not exist.
    async fn update(&self, id: &RecordId, fields: RecordFields) -> StoreResult<bool>;

    /// All records, oldest first.
    async fn list(&self) -> StoreResult<Vec<Record>>;
}
