use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use anchor_types::{Record, RecordFields, RecordId};

use crate::error::{StoreError, StoreResult};
use crate::traits::DocumentStore;

/// In-memory, HashMap-based document store.
///
/// Intended for tests and embedding. Insertion order is tracked separately
/// so that `list` is stable.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    records: HashMap<RecordId, RecordFields>,
    order: Vec<RecordId>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("records", &self.len())
            .finish()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, fields: RecordFields) -> StoreResult<RecordId> {
        let id = RecordId::generate();
        self.insert_record(Record::new(id.clone(), fields)).await?;
        Ok(id)
    }

    async fn insert_record(&self, record: Record) -> StoreResult<()> {
        let mut state = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        if state.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        debug!(identifier = %record.id, "record inserted");
        state.order.push(record.id.clone());
        state.records.insert(record.id, record.fields);
        Ok(())
    }

    async fn find(&self, id: &RecordId) -> StoreResult<Option<Record>> {
        let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state
            .records
            .get(id)
            .map(|fields| Record::new(id.clone(), fields.clone())))
    }

    async fn update(&self, id: &RecordId, fields: RecordFields) -> StoreResult<bool> {
        let mut state = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        match state.records.get_mut(id) {
            Some(existing) => {
                *existing = fields;
                debug!(identifier = %id, "record updated in place");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> StoreResult<Vec<Record>> {
        let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state
            .order
            .iter()
            .filter_map(|id| {
                state
                    .records
                    .get(id)
                    .map(|fields| Record::new(id.clone(), fields.clone()))
            })
            .collect())
    }
}
