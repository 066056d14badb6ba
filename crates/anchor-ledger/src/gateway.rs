use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use anchor_crypto::SigningKey;
use anchor_types::{AnchorEntry, Fingerprint, RecordId, SubmitterId, TxHash};

use crate::client::{EventStream, LedgerClient};
use crate::error::{ClientError, LedgerError, LedgerResult};
use crate::transaction::{
    LedgerCall, ReceiptStatus, SignedTransaction, TransactionBody, ViewCall, ViewValue,
};

/// Transaction parameters used by the [`LedgerGateway`].
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub gas_limit: u64,
    pub gas_price: u64,
    /// Upper bound on waiting for a submitted transaction to be included.
    pub confirmation_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gas_limit: 2_000_000,
            gas_price: 50_000_000_000,
            confirmation_timeout: Duration::from_secs(30),
        }
    }
}

/// Next sequence number for the submitter. `None` means it must be read
/// from the ledger before the next submission.
#[derive(Debug, Default)]
struct SequenceState {
    next: Option<u64>,
}

/// Single point through which the anchoring core writes to and reads from
/// the ledger.
///
/// The gateway owns the submitter's sequence state. `register` holds the
/// sequence lock from nonce assignment until the transaction is confirmed
/// (or the wait times out), so submissions from one gateway are strictly
/// serialized and nonces are issued without gaps or reuse. Share one
/// gateway per signing key.
pub struct LedgerGateway {
    client: Arc<dyn LedgerClient>,
    signer: SigningKey,
    submitter: SubmitterId,
    chain_id: u64,
    config: GatewayConfig,
    sequence: Mutex<SequenceState>,
}

impl LedgerGateway {
    /// Connect to a ledger node, reading its chain id once.
    pub async fn connect(
        client: Arc<dyn LedgerClient>,
        signer: SigningKey,
        config: GatewayConfig,
    ) -> LedgerResult<Self> {
        let chain_id = client.chain_id().await.map_err(unavailable)?;
        let submitter = signer.submitter_id();
        info!(chain_id, %submitter, "ledger gateway connected");
        Ok(Self {
            client,
            signer,
            submitter,
            chain_id,
            config,
            sequence: Mutex::new(SequenceState::default()),
        })
    }

    pub fn submitter(&self) -> SubmitterId {
        self.submitter
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Register `fingerprint` under `identifier` and wait for confirmation.
    ///
    /// Returns the confirmed transaction hash. Does not retry; see
    /// [`LedgerError`] for the failure modes. `OutcomeUnknown` means the
    /// transaction was accepted and may still be included, so callers
    /// should consult [`verify`](Self::verify) before resubmitting.
    pub async fn register(
        &self,
        identifier: &RecordId,
        fingerprint: &Fingerprint,
    ) -> LedgerResult<TxHash> {
        let mut sequence = self.sequence.lock().await;

        let nonce = match sequence.next {
            Some(nonce) => nonce,
            None => {
                let nonce = self
                    .client
                    .transaction_count(&self.submitter)
                    .await
                    .map_err(unavailable)?;
                debug!(nonce, submitter = %self.submitter, "sequence refreshed from ledger");
                nonce
            }
        };

        let tx = SignedTransaction::sign(
            TransactionBody {
                chain_id: self.chain_id,
                nonce,
                gas_limit: self.config.gas_limit,
                gas_price: self.config.gas_price,
                call: LedgerCall::RegisterItem {
                    item_id: identifier.clone(),
                    hash: *fingerprint,
                },
            },
            &self.signer,
        );

        let tx_hash = match self.client.send_transaction(tx).await {
            Ok(tx_hash) => {
                sequence.next = Some(nonce + 1);
                tx_hash
            }
            Err(ClientError::NonceMismatch {
                expected,
                submitted,
            }) => {
                sequence.next = None;
                warn!(expected, submitted, %identifier, "sequence collision; state reset");
                return Err(LedgerError::SequenceCollision {
                    expected,
                    submitted,
                });
            }
            Err(ClientError::Rejected(reason)) => {
                return Err(LedgerError::WriteFailed { reason });
            }
            Err(other) => {
                // The node may or may not have taken the nonce.
                sequence.next = None;
                return Err(unavailable(other));
            }
        };
        debug!(%tx_hash, nonce, %identifier, "registration submitted");

        let receipt = match tokio::time::timeout(
            self.config.confirmation_timeout,
            self.client.wait_for_receipt(&tx_hash),
        )
        .await
        {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => {
                warn!(%tx_hash, error = %e, "lost track of submitted transaction");
                return Err(LedgerError::OutcomeUnknown { tx_hash });
            }
            Err(_) => {
                warn!(%tx_hash, timeout = ?self.config.confirmation_timeout, "confirmation timed out");
                return Err(LedgerError::OutcomeUnknown { tx_hash });
            }
        };

        match receipt.status {
            ReceiptStatus::Success => {
                info!(%tx_hash, block = receipt.block_number, %identifier, fingerprint = %fingerprint.short_hex(), "registration confirmed");
                Ok(tx_hash)
            }
            ReceiptStatus::Reverted { reason } => Err(LedgerError::WriteFailed { reason }),
        }
    }

    /// Whether exactly this `(identifier, fingerprint)` pair is registered.
    ///
    /// Read-only; safe to call concurrently with `register`.
    pub async fn verify(
        &self,
        identifier: &RecordId,
        fingerprint: &Fingerprint,
    ) -> LedgerResult<bool> {
        let call = ViewCall::VerifyItem {
            item_id: identifier.clone(),
            hash: *fingerprint,
        };
        match self.client.call_view(&call).await.map_err(unavailable)? {
            ViewValue::Bool(registered) => Ok(registered),
            other => Err(LedgerError::UnexpectedResponse(format!(
                "verifyItem returned {other:?}"
            ))),
        }
    }

    /// Most recent entry registered under `identifier`, if any.
    pub async fn lookup(&self, identifier: &RecordId) -> LedgerResult<Option<AnchorEntry>> {
        let call = ViewCall::Items {
            item_id: identifier.clone(),
        };
        match self.client.call_view(&call).await.map_err(unavailable)? {
            ViewValue::Entry(entry) => Ok(entry),
            other => Err(LedgerError::UnexpectedResponse(format!(
                "items returned {other:?}"
            ))),
        }
    }

    /// Subscribe to a ledger event stream.
    pub fn subscribe(&self, event_name: &str) -> LedgerResult<EventStream> {
        self.client.subscribe(event_name).map_err(unavailable)
    }
}

fn unavailable(e: ClientError) -> LedgerError {
    LedgerError::Unavailable(e.to_string())
}
