use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use anchor_crypto::fingerprint_fields;
use anchor_ledger::LedgerGateway;
use anchor_store::DocumentStore;

use crate::error::ReconcileError;
use crate::publisher::AnchorPublisher;

/// Summary of one reconciliation sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    /// Current content is registered on the ledger.
    pub anchored: usize,
    /// Anchored, but the stored content no longer matches. Left alone.
    pub tampered: usize,
    /// Never anchored; a fresh anchor request was enqueued.
    pub republished: usize,
    pub publish_failed: usize,
    /// Never anchored, and the stored content cannot be anchored as is.
    /// Not republished, since the worker would only dead-letter it.
    pub unanchorable: usize,
}

/// Finds stored records that never reached the ledger and requests them
/// again.
///
/// Only records with no ledger entry at all are republished. A record whose
/// identifier is anchored with different content is reported, never
/// re-anchored, so that a later edit cannot make itself valid. Requests
/// that are still queued may be published twice; registration of a
/// repeated pair is harmless.
pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
    gateway: Arc<LedgerGateway>,
    publisher: AnchorPublisher,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        gateway: Arc<LedgerGateway>,
        publisher: AnchorPublisher,
    ) -> Self {
        Self {
            store,
            gateway,
            publisher,
        }
    }

    /// Check every stored record once.
    pub async fn sweep(&self) -> Result<ReconcileReport, ReconcileError> {
        let records = self.store.list().await?;
        let mut report = ReconcileReport {
            scanned: records.len(),
            ..ReconcileReport::default()
        };

        for record in &records {
            let fingerprint = fingerprint_fields(&record.fields);
            if self.gateway.verify(&record.id, &fingerprint).await? {
                report.anchored += 1;
                continue;
            }
            if let Some(entry) = self.gateway.lookup(&record.id).await? {
                warn!(
                    identifier = %record.id,
                    current = %fingerprint,
                    anchored = %entry.fingerprint,
                    "stored record differs from its anchor"
                );
                report.tampered += 1;
                continue;
            }
            if let Err(e) = record.fields.validate() {
                warn!(identifier = %record.id, error = %e, "stored record cannot be anchored");
                report.unanchorable += 1;
                continue;
            }
            match self.publisher.publish(record).await {
                Ok(()) => {
                    debug!(identifier = %record.id, "anchor request republished");
                    report.republished += 1;
                }
                Err(e) => {
                    error!(error = %e, "republish failed");
                    report.publish_failed += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            anchored = report.anchored,
            tampered = report.tampered,
            republished = report.republished,
            publish_failed = report.publish_failed,
            unanchorable = report.unanchorable,
            "reconciliation sweep finished"
        );
        Ok(report)
    }

    /// Sweep every `interval` until `shutdown` flips. A failed sweep is
    /// logged and retried on the next tick.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval = ?interval, "reconciler started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!(error = %e, "reconciliation sweep failed");
                    }
                }
            }
        }
        info!("reconciler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_crypto::SigningKey;
    use anchor_ledger::{GatewayConfig, InMemoryLedger, LedgerClient};
    use anchor_queue::{InMemoryQueue, ANCHOR_TOPIC};
    use anchor_store::InMemoryDocumentStore;
    use anchor_types::{AnchorRequest, Record, RecordFields, RecordId};

    struct Fixture {
        store: Arc<InMemoryDocumentStore>,
        ledger: Arc<InMemoryLedger>,
        queue: Arc<InMemoryQueue>,
        gateway: Arc<LedgerGateway>,
        reconciler: Reconciler,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDocumentStore::new());
        let ledger = Arc::new(InMemoryLedger::default());
        let queue = Arc::new(InMemoryQueue::default());
        let client: Arc<dyn LedgerClient> = ledger.clone();
        let gateway = Arc::new(
            LedgerGateway::connect(client, SigningKey::generate(), GatewayConfig::default())
                .await
                .unwrap(),
        );
        let reconciler = Reconciler::new(
            store.clone(),
            gateway.clone(),
            AnchorPublisher::new(queue.clone(), ANCHOR_TOPIC),
        );
        Fixture {
            store,
            ledger,
            queue,
            gateway,
            reconciler,
        }
    }

    async fn store(f: &Fixture, id: &str, status: &str) -> Record {
        let record = Record::new(
            RecordId::parse(id).unwrap(),
            RecordFields::new("L100", status, "2024-01-01T00:00:00"),
        );
        f.store.insert_record(record.clone()).await.unwrap();
        record
    }

    #[tokio::test]
    async fn classifies_and_republishes_only_unanchored() {
        let f = fixture().await;
        let anchored = store(&f, "anchored", "received").await;
        let tampered = store(&f, "tampered", "received").await;
        let missing = store(&f, "missing", "received").await;

        for record in [&anchored, &tampered] {
            f.gateway
                .register(&record.id, &fingerprint_fields(&record.fields))
                .await
                .unwrap();
        }
        f.store
            .update(&tampered.id, RecordFields::new("L100", "shipped", "2024-01-01T00:00:00"))
            .await
            .unwrap();

        let report = f.reconciler.sweep().await.unwrap();
        assert_eq!(
            report,
            ReconcileReport {
                scanned: 3,
                anchored: 1,
                tampered: 1,
                republished: 1,
                publish_failed: 0,
                unanchorable: 0,
            }
        );

        let delivery = f.queue.try_dequeue(ANCHOR_TOPIC).unwrap().unwrap();
        assert_eq!(
            AnchorRequest::parse(&delivery.payload).unwrap(),
            AnchorRequest::from_record(&missing)
        );
        assert_eq!(f.queue.ready_len(ANCHOR_TOPIC), 0);
    }

    #[tokio::test]
    async fn unanchorable_records_are_not_republished() {
        let f = fixture().await;
        f.store
            .insert_record(Record::new(
                RecordId::parse("tabbed").unwrap(),
                RecordFields::new("L1", "received\t", "2024-01-01T00:00:00"),
            ))
            .await
            .unwrap();

        for _ in 0..3 {
            let report = f.reconciler.sweep().await.unwrap();
            assert_eq!(report.unanchorable, 1);
            assert_eq!(report.republished, 0);
        }
        assert_eq!(f.queue.ready_len(ANCHOR_TOPIC), 0);
        assert!(f.queue.dead_letters(ANCHOR_TOPIC).is_empty());
    }

    #[tokio::test]
    async fn closed_queue_counts_failures() {
        let f = fixture().await;
        store(&f, "missing", "received").await;
        f.queue.close();

        let report = f.reconciler.sweep().await.unwrap();
        assert_eq!(report.publish_failed, 1);
        assert_eq!(report.republished, 0);
    }

    #[tokio::test]
    async fn ledger_outage_aborts_the_sweep() {
        let f = fixture().await;
        store(&f, "missing", "received").await;
        f.ledger.set_unavailable(true);
        assert!(matches!(
            f.reconciler.sweep().await,
            Err(ReconcileError::Ledger(_))
        ));
    }

    #[tokio::test]
    async fn run_sweeps_until_shutdown() {
        let f = fixture().await;
        store(&f, "missing", "received").await;
        let (tx, rx) = watch::channel(false);
        let reconciler = Arc::new(f.reconciler);

        let task = {
            let reconciler = Arc::clone(&reconciler);
            tokio::spawn(async move { reconciler.run(Duration::from_millis(10), rx).await })
        };
        // The first tick fires immediately.
        for _ in 0..100 {
            if f.queue.ready_len(ANCHOR_TOPIC) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tx.send(true).unwrap();
        task.await.unwrap();
        assert!(f.queue.ready_len(ANCHOR_TOPIC) >= 1);
    }
}
