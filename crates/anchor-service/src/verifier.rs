use std::sync::Arc;

use tracing::{debug, warn};

use anchor_crypto::fingerprint_fields;
use anchor_ledger::LedgerGateway;
use anchor_store::DocumentStore;
use anchor_types::{RecordId, VerificationStatus};

use crate::error::VerifyError;

/// Checks a stored record against its ledger anchor.
///
/// The fingerprint is recomputed from the record as it is stored now and
/// looked up as an exact `(identifier, fingerprint)` pair. Read-only: it
/// never writes to the store or the ledger.
pub struct Verifier {
    store: Arc<dyn DocumentStore>,
    gateway: Arc<LedgerGateway>,
}

impl Verifier {
    pub fn new(store: Arc<dyn DocumentStore>, gateway: Arc<LedgerGateway>) -> Self {
        Self { store, gateway }
    }

    /// Verdict for the record stored under `identifier`.
    ///
    /// - `NotFound`: no such record in the store.
    /// - `Valid`: the current fingerprint is registered under the identifier.
    /// - `Invalid`: the identifier is anchored, but with other content.
    /// - `NotAnchored`: nothing is registered under the identifier yet.
    pub async fn verify_record(
        &self,
        identifier: &RecordId,
    ) -> Result<VerificationStatus, VerifyError> {
        let Some(record) = self.store.find(identifier).await? else {
            debug!(%identifier, "verification requested for unknown record");
            return Ok(VerificationStatus::NotFound);
        };

        let fingerprint = fingerprint_fields(&record.fields);
        if self.gateway.verify(identifier, &fingerprint).await? {
            debug!(%identifier, %fingerprint, "record matches its anchor");
            return Ok(VerificationStatus::Valid);
        }

        let status = match self.gateway.lookup(identifier).await? {
            Some(entry) => {
                warn!(
                    %identifier,
                    current = %fingerprint,
                    anchored = %entry.fingerprint,
                    "record differs from its anchor"
                );
                VerificationStatus::Invalid
            }
            None => VerificationStatus::NotAnchored,
        };
        Ok(status)
    }
}
