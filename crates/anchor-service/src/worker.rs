use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use anchor_crypto::fingerprint_fields;
use anchor_ledger::{LedgerError, LedgerGateway};
use anchor_queue::{Delivery, MessageQueue, QueueError};
use anchor_types::{AnchorRequest, Fingerprint, RecordId, RequestError, TxHash};

use crate::config::WorkerConfig;
use crate::error::WorkerError;

/// Progress of one delivery through the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorState {
    Received,
    Fingerprinted,
    Submitted,
    Confirmed,
    SubmissionFailed,
}

impl fmt::Display for AnchorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Fingerprinted => "fingerprinted",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::SubmissionFailed => "submission_failed",
        };
        f.write_str(s)
    }
}

/// Terminal result of processing one delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The pair is on the ledger and the delivery was acked. `tx_hash` is
    /// `None` when it was already registered and nothing was submitted.
    Confirmed {
        identifier: RecordId,
        fingerprint: Fingerprint,
        tx_hash: Option<TxHash>,
    },
    /// The payload was not a valid anchor request; it was dead-lettered
    /// without touching the ledger.
    Malformed(RequestError),
    /// Every attempt failed. The delivery was requeued when the ledger may
    /// still accept it later, dead-lettered otherwise.
    Failed {
        identifier: RecordId,
        error: LedgerError,
        requeued: bool,
    },
}

impl DeliveryOutcome {
    pub fn state(&self) -> AnchorState {
        match self {
            Self::Confirmed { .. } => AnchorState::Confirmed,
            Self::Malformed(_) | Self::Failed { .. } => AnchorState::SubmissionFailed,
        }
    }
}

/// Counters over a worker's lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub confirmed: u64,
    pub already_anchored: u64,
    pub malformed: u64,
    pub failed: u64,
    /// Deliveries whose ack or nack the queue refused.
    pub settle_failed: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Confirmed { tx_hash: Some(_), .. } => self.confirmed += 1,
            DeliveryOutcome::Confirmed { tx_hash: None, .. } => self.already_anchored += 1,
            DeliveryOutcome::Malformed(_) => self.malformed += 1,
            DeliveryOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Queue consumer that registers fingerprints on the ledger.
///
/// One delivery is driven to a terminal state before the next is taken.
/// Deliveries are acked only after the ledger confirms, so a crash between
/// dequeue and confirmation leads to redelivery rather than loss; the
/// ledger treats a repeated pair as a harmless duplicate.
pub struct AnchorWorker {
    queue: Arc<dyn MessageQueue>,
    gateway: Arc<LedgerGateway>,
    topic: String,
    config: WorkerConfig,
}

impl AnchorWorker {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        gateway: Arc<LedgerGateway>,
        topic: impl Into<String>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            gateway,
            topic: topic.into(),
            config,
        }
    }

    /// Consume until `shutdown` flips to `true` or the queue closes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<WorkerStats, WorkerError> {
        let mut stats = WorkerStats::default();
        info!(topic = %self.topic, submitter = %self.gateway.submitter(), "anchor worker waiting for messages");

        loop {
            if *shutdown.borrow() {
                break;
            }
            let delivery = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                next = self.queue.dequeue(&self.topic) => match next {
                    Ok(delivery) => delivery,
                    Err(QueueError::Closed) => break,
                    Err(e) => return Err(e.into()),
                },
            };
            match self.process(&delivery).await {
                Ok(outcome) => stats.record(&outcome),
                Err(WorkerError::Queue(QueueError::Closed)) => break,
                // The delivery stays unsettled and comes back on recovery;
                // the redelivery path checks the ledger before submitting.
                Err(e) => {
                    error!(tag = delivery.tag, error = %e, "failed to settle delivery");
                    stats.settle_failed += 1;
                }
            }
        }

        info!(?stats, "anchor worker stopped");
        Ok(stats)
    }

    /// Drive one delivery to a terminal state and settle it with the queue.
    pub async fn process(&self, delivery: &Delivery) -> Result<DeliveryOutcome, WorkerError> {
        trace_state(delivery.tag, AnchorState::Received);

        let request = match AnchorRequest::parse(&delivery.payload) {
            Ok(request) => request,
            Err(e) => {
                error!(tag = delivery.tag, error = %e, "malformed anchor request dead-lettered");
                self.queue.nack(delivery, false).await?;
                trace_state(delivery.tag, AnchorState::SubmissionFailed);
                return Ok(DeliveryOutcome::Malformed(e));
            }
        };

        let fingerprint = fingerprint_fields(&request.fields);
        trace_state(delivery.tag, AnchorState::Fingerprinted);

        trace_state(delivery.tag, AnchorState::Submitted);
        let outcome = match self
            .anchor(&request.identifier, &fingerprint, delivery.redelivered)
            .await
        {
            Ok(tx_hash) => {
                self.queue.ack(delivery).await?;
                match tx_hash {
                    Some(tx_hash) => info!(identifier = %request.identifier, %tx_hash, "anchored"),
                    None => info!(identifier = %request.identifier, "already anchored; acked without resubmitting"),
                }
                DeliveryOutcome::Confirmed {
                    identifier: request.identifier,
                    fingerprint,
                    tx_hash,
                }
            }
            Err(error) => {
                let requeued = matches!(
                    error,
                    LedgerError::Unavailable(_)
                        | LedgerError::OutcomeUnknown { .. }
                        | LedgerError::SequenceCollision { .. }
                );
                error!(
                    identifier = %request.identifier,
                    fingerprint = %fingerprint,
                    error = %error,
                    requeued,
                    "anchoring failed"
                );
                self.queue.nack(delivery, requeued).await?;
                DeliveryOutcome::Failed {
                    identifier: request.identifier,
                    error,
                    requeued,
                }
            }
        };
        trace_state(delivery.tag, outcome.state());
        Ok(outcome)
    }

    /// Register with retries. Checks the ledger first whenever an earlier
    /// attempt (or an earlier delivery) may already have landed.
    async fn anchor(
        &self,
        identifier: &RecordId,
        fingerprint: &Fingerprint,
        redelivered: bool,
    ) -> Result<Option<TxHash>, LedgerError> {
        let attempts = self.config.max_attempts.max(1);
        let mut check_first = redelivered;
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.config.backoff(attempt - 1)).await;
            }

            if check_first {
                match self.gateway.verify(identifier, fingerprint).await {
                    Ok(true) => return Ok(None),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(%identifier, attempt, error = %e, "pre-submission check failed");
                        last_error = Some(e);
                        continue;
                    }
                }
            }

            debug!(%identifier, attempt, "submitting registration");
            match self.gateway.register(identifier, fingerprint).await {
                Ok(tx_hash) => return Ok(Some(tx_hash)),
                Err(e) => {
                    warn!(%identifier, attempt, error = %e, "registration attempt failed");
                    check_first = e.needs_reverify();
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LedgerError::Unavailable("no attempt made".into())))
    }
}

fn trace_state(tag: u64, state: AnchorState) {
    debug!(tag, %state, "delivery state");
}
