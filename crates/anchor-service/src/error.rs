use anchor_ledger::LedgerError;
use anchor_queue::QueueError;
use anchor_store::StoreError;
use anchor_types::{RecordId, TypeError};

/// The anchor request for a stored record could not be handed to the queue.
///
/// The record itself stays stored; it is "stored but not yet
/// anchor-requested" until republished.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to enqueue anchor request for {identifier}: {source}")]
    Delivery {
        identifier: RecordId,
        #[source]
        source: QueueError,
    },
}

/// Verification could not reach a verdict.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Errors that abort a reconciliation sweep.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Errors that stop the anchor worker. Per-delivery failures are not
/// errors; they end in a [`DeliveryOutcome`](crate::DeliveryOutcome).
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

/// A record update was refused before anything was stored.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("invalid record fields: {0}")]
    InvalidFields(#[from] TypeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
