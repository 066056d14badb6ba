//! End-to-end flows over the in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use anchor_crypto::SigningKey;
use anchor_ledger::{GatewayConfig, InMemoryLedger, LedgerClient, LedgerGateway};
use anchor_queue::{InMemoryQueue, MessageQueue, ANCHOR_TOPIC};
use anchor_store::{DocumentStore, InMemoryDocumentStore};
use anchor_types::{Record, RecordFields, RecordId, VerificationStatus};

use crate::{AnchorNode, DeliveryOutcome, WorkerConfig};

const RECEIVED_HASH: &str = "24b5d98f0912941558241644b81226b54e4df5fa65b7ea70fcc99bf21edb5561";

struct Deployment {
    store: Arc<InMemoryDocumentStore>,
    queue: Arc<InMemoryQueue>,
    ledger: Arc<InMemoryLedger>,
    node: AnchorNode,
}

async fn deployment() -> Deployment {
    let store = Arc::new(InMemoryDocumentStore::new());
    let queue = Arc::new(InMemoryQueue::default());
    let ledger = Arc::new(InMemoryLedger::default());
    let client: Arc<dyn LedgerClient> = ledger.clone();
    let gateway = LedgerGateway::connect(client, SigningKey::generate(), GatewayConfig::default())
        .await
        .unwrap();
    let node = AnchorNode::new(store.clone(), queue.clone(), Arc::new(gateway), ANCHOR_TOPIC)
        .with_worker_config(WorkerConfig {
            max_attempts: 2,
            backoff_base_ms: 1,
            backoff_max_ms: 2,
        });
    Deployment {
        store,
        queue,
        ledger,
        node,
    }
}

fn abc123() -> RecordId {
    RecordId::parse("abc123").unwrap()
}

fn received() -> RecordFields {
    RecordFields::new("L100", "received", "2024-01-01T00:00:00")
}

/// Store `abc123` and publish its anchor request, the way the API does for
/// a generated id.
async fn store_and_publish(d: &Deployment) -> Record {
    let record = Record::new(abc123(), received());
    d.store.insert_record(record.clone()).await.unwrap();
    d.node.publisher().publish(&record).await.unwrap();
    record
}

async fn drain_one(d: &Deployment) -> DeliveryOutcome {
    let delivery = d.queue.try_dequeue(ANCHOR_TOPIC).unwrap().unwrap();
    d.node.worker().process(&delivery).await.unwrap()
}

#[tokio::test]
async fn anchored_record_verifies_valid() {
    let d = deployment().await;
    store_and_publish(&d).await;

    match drain_one(&d).await {
        DeliveryOutcome::Confirmed { fingerprint, tx_hash, .. } => {
            assert_eq!(fingerprint.to_hex(), RECEIVED_HASH);
            assert!(tx_hash.is_some());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(d.node.verify(&abc123()).await.unwrap(), VerificationStatus::Valid);

    let entry = d.node.gateway().lookup(&abc123()).await.unwrap().unwrap();
    assert_eq!(entry.fingerprint.to_hex(), RECEIVED_HASH);
    assert_eq!(entry.submitter, d.node.gateway().submitter());
}

#[tokio::test]
async fn edit_after_anchoring_is_detected() {
    let d = deployment().await;
    store_and_publish(&d).await;
    drain_one(&d).await;

    d.store
        .update(&abc123(), RecordFields::new("L100", "shipped", "2024-01-01T00:00:00"))
        .await
        .unwrap();
    assert_eq!(d.node.verify(&abc123()).await.unwrap(), VerificationStatus::Invalid);
}

#[tokio::test]
async fn record_not_yet_processed_is_not_anchored() {
    let d = deployment().await;
    store_and_publish(&d).await;
    assert_eq!(
        d.node.verify(&abc123()).await.unwrap(),
        VerificationStatus::NotAnchored
    );
    assert_eq!(
        d.node.verify(&RecordId::parse("nope").unwrap()).await.unwrap(),
        VerificationStatus::NotFound
    );
}

#[tokio::test]
async fn malformed_message_is_dead_lettered_without_ledger_activity() {
    let d = deployment().await;
    let payload = br#"{"_id":"abc123","numero_do_lote":"L100","status":"received"}"#.to_vec();
    d.queue.enqueue(ANCHOR_TOPIC, payload.clone()).await.unwrap();

    assert!(matches!(drain_one(&d).await, DeliveryOutcome::Malformed(_)));
    assert_eq!(d.ledger.block_number(), 0);
    assert_eq!(d.ledger.entry_count(), 0);
    assert_eq!(d.queue.dead_letters(ANCHOR_TOPIC), vec![payload]);
}

#[tokio::test]
async fn crash_before_ack_redelivers_without_a_second_entry() {
    let d = deployment().await;
    store_and_publish(&d).await;

    // First consumer registers but dies before acking.
    let delivery = d.queue.try_dequeue(ANCHOR_TOPIC).unwrap().unwrap();
    d.node
        .gateway()
        .register(&abc123(), &anchor_crypto::fingerprint_fields(&received()))
        .await
        .unwrap();
    assert_eq!(d.queue.recover().unwrap(), 1);
    let blocks = d.ledger.block_number();

    let redelivered = d.queue.try_dequeue(ANCHOR_TOPIC).unwrap().unwrap();
    assert_eq!(redelivered.payload, delivery.payload);
    let outcome = d.node.worker().process(&redelivered).await.unwrap();

    assert!(matches!(outcome, DeliveryOutcome::Confirmed { tx_hash: None, .. }));
    assert_eq!(d.ledger.block_number(), blocks);
    assert_eq!(d.ledger.entries(&abc123()).len(), 1);
    assert_eq!(d.node.verify(&abc123()).await.unwrap(), VerificationStatus::Valid);
}

#[tokio::test]
async fn both_versions_of_an_identifier_stay_on_the_ledger() {
    let d = deployment().await;
    store_and_publish(&d).await;
    drain_one(&d).await;

    let shipped = Record::new(abc123(), RecordFields::new("L100", "shipped", "2024-01-02T00:00:00"));
    d.store.update(&shipped.id, shipped.fields.clone()).await.unwrap();
    d.node.publisher().publish(&shipped).await.unwrap();
    drain_one(&d).await;

    assert_eq!(d.ledger.entries(&abc123()).len(), 2);
    assert_eq!(d.node.verify(&abc123()).await.unwrap(), VerificationStatus::Valid);
}

#[tokio::test]
async fn concurrent_workers_never_collide() {
    let d = deployment().await;
    for i in 0..10 {
        let record = Record::new(
            RecordId::parse(&format!("lot-{i}")).unwrap(),
            RecordFields::new(format!("L{i}"), "received", "2024-01-01T00:00:00"),
        );
        d.store.insert_record(record.clone()).await.unwrap();
        d.node.publisher().publish(&record).await.unwrap();
    }

    let handle = d.node.spawn();
    let second = d.node.spawn();
    for _ in 0..200 {
        if d.ledger.entry_count() == 10 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    handle.shutdown().await;
    second.shutdown().await;

    assert_eq!(d.ledger.entry_count(), 10);
    assert_eq!(
        d.ledger
            .transaction_count(&d.node.gateway().submitter())
            .await
            .unwrap(),
        10
    );
    assert!(d.queue.dead_letters(ANCHOR_TOPIC).is_empty());
}

#[tokio::test]
async fn reconciler_recovers_a_lost_publish() {
    let d = deployment().await;
    // Stored, but the anchor request never made it to the queue.
    d.store.insert_record(Record::new(abc123(), received())).await.unwrap();

    let report = d.node.reconciler().sweep().await.unwrap();
    assert_eq!(report.republished, 1);
    drain_one(&d).await;
    assert_eq!(d.node.verify(&abc123()).await.unwrap(), VerificationStatus::Valid);

    let report = d.node.reconciler().sweep().await.unwrap();
    assert_eq!(report.anchored, 1);
    assert_eq!(report.republished, 0);
}
