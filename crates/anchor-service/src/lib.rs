//! Anchoring core of the lot anchoring service.
//!
//! Bridges a mutable document store and an append-only ledger:
//!
//! 1. [`AnchorPublisher`] turns a freshly stored record into an anchor
//!    request on the queue.
//! 2. [`AnchorWorker`] consumes requests one at a time, fingerprints the
//!    record version and registers it through the [`LedgerGateway`],
//!    acknowledging only after confirmation.
//! 3. [`Verifier`] recomputes the fingerprint of the stored record and
//!    reports `valid`, `invalid`, `not_found` or `not_anchored`.
//! 4. [`EventObserver`] logs ledger registration events for auditing.
//! 5. [`Reconciler`] republishes requests for stored records that never
//!    reached the ledger.
//!
//! [`AnchorNode`] wires these together over shared backends.
//!
//! [`LedgerGateway`]: anchor_ledger::LedgerGateway

pub mod config;
pub mod error;
pub mod node;
pub mod observer;
pub mod publisher;
pub mod reconcile;
pub mod verifier;
pub mod worker;

#[cfg(test)]
mod scenarios;

pub use config::{ObserverConfig, ReconcileConfig, WorkerConfig};
pub use error::{PublishError, ReconcileError, UpdateError, VerifyError, WorkerError};
pub use node::{AnchorNode, NodeHandle, UpdateOutcome};
pub use observer::{EventObserver, ObserverStats};
pub use publisher::AnchorPublisher;
pub use reconcile::{ReconcileReport, Reconciler};
pub use verifier::Verifier;
pub use worker::{AnchorState, AnchorWorker, DeliveryOutcome, WorkerStats};

// Re-export key types
pub use anchor_types::{AnchorRequest, Fingerprint, Record, RecordFields, RecordId, VerificationStatus};
