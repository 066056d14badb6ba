use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use anchor_types::{AnchorEntry, RecordId, SubmitterId, TxHash};

use crate::client::{EventStream, LedgerClient};
use crate::error::{ClientError, ClientResult};
use crate::transaction::{
    LedgerCall, LedgerEvent, ReceiptStatus, SignedTransaction, TransactionReceipt, ViewCall,
    ViewValue, ITEM_REGISTERED,
};

/// Flat cost of any transaction.
pub const INTRINSIC_GAS: u64 = 21_000;
/// Cost per byte of calldata.
pub const CALLDATA_GAS_PER_BYTE: u64 = 16;
/// Cost of writing a new anchor entry.
pub const STORE_ENTRY_GAS: u64 = 44_000;
/// Cost of a registration that finds its pair already stored.
pub const DUPLICATE_CHECK_GAS: u64 = 2_100;

const EVENT_CAPACITY: usize = 1024;

/// In-memory single-node chain for tests, local demos, and embedding.
///
/// Accepted transactions are mined immediately, one block per submission,
/// unless mining is paused. Registration follows the anchor contract:
/// entries are keyed by identifier, a repeated `(identifier, fingerprint)`
/// pair succeeds without a new entry or event, and nothing is ever removed.
pub struct InMemoryLedger {
    chain_id: u64,
    inner: Mutex<ChainState>,
    blocks: watch::Sender<u64>,
    events: broadcast::Sender<LedgerEvent>,
}

#[derive(Default)]
struct ChainState {
    nonces: HashMap<SubmitterId, u64>,
    pending: Vec<PendingTx>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    items: HashMap<RecordId, Vec<AnchorEntry>>,
    block_number: u64,
    mining_paused: bool,
    unavailable: bool,
}

struct PendingTx {
    hash: TxHash,
    sender: SubmitterId,
    tx: SignedTransaction,
}

impl InMemoryLedger {
    pub fn new(chain_id: u64) -> Self {
        let (blocks, _) = watch::channel(0);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            chain_id,
            inner: Mutex::new(ChainState::default()),
            blocks,
            events,
        }
    }

    /// Stop producing blocks. Accepted transactions stay pending.
    pub fn pause_mining(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.mining_paused = true;
        }
    }

    /// Resume block production and mine everything pending.
    ///
    /// Returns the number of transactions included.
    pub fn resume_mining(&self) -> usize {
        let Ok(mut state) = self.inner.lock() else {
            return 0;
        };
        state.mining_paused = false;
        let count = state.pending.len();
        let events = mine_pending(&mut state);
        let block = state.block_number;
        drop(state);
        self.publish(block, events);
        count
    }

    /// Simulate the node becoming unreachable (or reachable again).
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.inner.lock() {
            state.unavailable = unavailable;
        }
    }

    pub fn block_number(&self) -> u64 {
        self.inner.lock().map(|s| s.block_number).unwrap_or(0)
    }

    /// All entries registered under an identifier, oldest first.
    pub fn entries(&self, item_id: &RecordId) -> Vec<AnchorEntry> {
        self.inner
            .lock()
            .ok()
            .and_then(|s| s.items.get(item_id).cloned())
            .unwrap_or_default()
    }

    /// Total entries across all identifiers.
    pub fn entry_count(&self) -> usize {
        self.inner
            .lock()
            .map(|s| s.items.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().map(|s| s.pending.len()).unwrap_or(0)
    }

    fn state(&self) -> ClientResult<MutexGuard<'_, ChainState>> {
        let state = self
            .inner
            .lock()
            .map_err(|_| ClientError::Unavailable("ledger state lock poisoned".into()))?;
        if state.unavailable {
            return Err(ClientError::Unavailable("connection refused".into()));
        }
        Ok(state)
    }

    fn publish(&self, block: u64, events: Vec<LedgerEvent>) {
        for event in events {
            // No subscribers is not an error.
            let _ = self.events.send(event);
        }
        self.blocks.send_replace(block);
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(1337)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn intrinsic_gas(call: &LedgerCall) -> u64 {
    INTRINSIC_GAS + CALLDATA_GAS_PER_BYTE * call.calldata_len() as u64
}

/// Include every pending transaction in one new block.
fn mine_pending(state: &mut ChainState) -> Vec<LedgerEvent> {
    if state.pending.is_empty() {
        return Vec::new();
    }
    state.block_number += 1;
    let block_number = state.block_number;
    let timestamp = now_secs();
    let mut events = Vec::new();

    for pending in std::mem::take(&mut state.pending) {
        let (receipt, event) = execute(state, pending, block_number, timestamp);
        debug!(
            tx_hash = %receipt.tx_hash,
            block = block_number,
            success = receipt.is_success(),
            "transaction included"
        );
        state.receipts.insert(receipt.tx_hash, receipt);
        events.extend(event);
    }
    events
}

fn execute(
    state: &mut ChainState,
    pending: PendingTx,
    block_number: u64,
    timestamp: u64,
) -> (TransactionReceipt, Option<LedgerEvent>) {
    let PendingTx { hash, sender, tx } = pending;
    let gas_limit = tx.body.gas_limit;
    let base = intrinsic_gas(&tx.body.call);

    let reverted = |gas_used: u64, reason: &str| TransactionReceipt {
        tx_hash: hash,
        block_number,
        gas_used,
        status: ReceiptStatus::Reverted {
            reason: reason.to_string(),
        },
    };

    match tx.body.call {
        LedgerCall::RegisterItem { item_id, hash: fingerprint } => {
            let entries = state.items.entry(item_id.clone()).or_default();
            let duplicate = entries.iter().any(|e| e.fingerprint == fingerprint);
            let cost = base + if duplicate { DUPLICATE_CHECK_GAS } else { STORE_ENTRY_GAS };
            if gas_limit < cost {
                return (reverted(gas_limit, "out of gas"), None);
            }

            let receipt = TransactionReceipt {
                tx_hash: hash,
                block_number,
                gas_used: cost,
                status: ReceiptStatus::Success,
            };
            if duplicate {
                return (receipt, None);
            }

            let entry = AnchorEntry {
                identifier: item_id,
                fingerprint,
                registered_at: timestamp,
                submitter: sender,
            };
            entries.push(entry.clone());
            let event = LedgerEvent {
                name: ITEM_REGISTERED.to_string(),
                entry,
                block_number,
                tx_hash: hash,
            };
            (receipt, Some(event))
        }
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn chain_id(&self) -> ClientResult<u64> {
        drop(self.state()?);
        Ok(self.chain_id)
    }

    async fn transaction_count(&self, submitter: &SubmitterId) -> ClientResult<u64> {
        let state = self.state()?;
        Ok(state.nonces.get(submitter).copied().unwrap_or(0))
    }

    async fn send_transaction(&self, tx: SignedTransaction) -> ClientResult<TxHash> {
        let mut state = self.state()?;

        if tx.body.chain_id != self.chain_id {
            return Err(ClientError::Rejected(format!(
                "wrong chain id {} (expected {})",
                tx.body.chain_id, self.chain_id
            )));
        }
        let sender = tx.recover_sender()?;

        let expected = state.nonces.get(&sender).copied().unwrap_or(0);
        if tx.body.nonce != expected {
            return Err(ClientError::NonceMismatch {
                expected,
                submitted: tx.body.nonce,
            });
        }
        if tx.body.gas_limit < intrinsic_gas(&tx.body.call) {
            return Err(ClientError::Rejected("intrinsic gas too low".into()));
        }

        let hash = tx.hash();
        state.nonces.insert(sender, expected + 1);
        state.pending.push(PendingTx { hash, sender, tx });
        info!(tx_hash = %hash, %sender, nonce = expected, "transaction accepted");

        if state.mining_paused {
            return Ok(hash);
        }
        let events = mine_pending(&mut state);
        let block = state.block_number;
        drop(state);
        self.publish(block, events);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> ClientResult<TransactionReceipt> {
        let mut blocks = self.blocks.subscribe();
        loop {
            {
                let state = self.state()?;
                if let Some(receipt) = state.receipts.get(tx_hash) {
                    return Ok(receipt.clone());
                }
                if !state.pending.iter().any(|p| p.hash == *tx_hash) {
                    return Err(ClientError::UnknownTransaction(*tx_hash));
                }
            }
            blocks
                .changed()
                .await
                .map_err(|_| ClientError::Unavailable("ledger shut down".into()))?;
        }
    }

    async fn call_view(&self, call: &ViewCall) -> ClientResult<ViewValue> {
        let state = self.state()?;
        let value = match call {
            ViewCall::VerifyItem { item_id, hash } => ViewValue::Bool(
                state
                    .items
                    .get(item_id)
                    .is_some_and(|entries| entries.iter().any(|e| e.fingerprint == *hash)),
            ),
            ViewCall::Items { item_id } => {
                ViewValue::Entry(state.items.get(item_id).and_then(|e| e.last().cloned()))
            }
        };
        Ok(value)
    }

    fn subscribe(&self, event_name: &str) -> ClientResult<EventStream> {
        if event_name != ITEM_REGISTERED {
            return Err(ClientError::UnknownEvent(event_name.to_string()));
        }
        Ok(self.events.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use anchor_crypto::SigningKey;
    use anchor_types::Fingerprint;

    use crate::transaction::TransactionBody;

    fn register(key: &SigningKey, nonce: u64, item: &str, fp: u8) -> SignedTransaction {
        register_with_gas(key, nonce, item, fp, 2_000_000)
    }

    fn register_with_gas(
        key: &SigningKey,
        nonce: u64,
        item: &str,
        fp: u8,
        gas_limit: u64,
    ) -> SignedTransaction {
        SignedTransaction::sign(
            TransactionBody {
                chain_id: 1337,
                nonce,
                gas_limit,
                gas_price: 50_000_000_000,
                call: LedgerCall::RegisterItem {
                    item_id: RecordId::parse(item).unwrap(),
                    hash: Fingerprint::from_digest([fp; 32]),
                },
            },
            key,
        )
    }

    fn verify_call(item: &str, fp: u8) -> ViewCall {
        ViewCall::VerifyItem {
            item_id: RecordId::parse(item).unwrap(),
            hash: Fingerprint::from_digest([fp; 32]),
        }
    }

    #[tokio::test]
    async fn register_then_verify() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        let hash = ledger.send_transaction(register(&key, 0, "abc123", 1)).await.unwrap();

        let receipt = ledger.wait_for_receipt(&hash).await.unwrap();
        assert!(receipt.is_success());
        assert_eq!(receipt.block_number, 1);

        assert_eq!(ledger.call_view(&verify_call("abc123", 1)).await.unwrap(), ViewValue::Bool(true));
        assert_eq!(ledger.call_view(&verify_call("abc123", 2)).await.unwrap(), ViewValue::Bool(false));
        assert_eq!(ledger.call_view(&verify_call("other", 1)).await.unwrap(), ViewValue::Bool(false));
    }

    #[tokio::test]
    async fn items_view_returns_latest_entry() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        ledger.send_transaction(register(&key, 0, "abc123", 1)).await.unwrap();
        ledger.send_transaction(register(&key, 1, "abc123", 2)).await.unwrap();

        let item_id = RecordId::parse("abc123").unwrap();
        let ViewValue::Entry(Some(entry)) = ledger
            .call_view(&ViewCall::Items { item_id: item_id.clone() })
            .await
            .unwrap()
        else {
            panic!("expected an entry");
        };
        assert_eq!(entry.fingerprint, Fingerprint::from_digest([2; 32]));
        assert_eq!(entry.submitter, key.submitter_id());
        assert_eq!(ledger.entries(&item_id).len(), 2);

        let missing = ledger
            .call_view(&ViewCall::Items { item_id: RecordId::parse("none").unwrap() })
            .await
            .unwrap();
        assert_eq!(missing, ViewValue::Entry(None));
    }

    #[tokio::test]
    async fn duplicate_pair_is_harmless() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        let mut events = ledger.subscribe(ITEM_REGISTERED).unwrap();

        ledger.send_transaction(register(&key, 0, "abc123", 1)).await.unwrap();
        let second = ledger.send_transaction(register(&key, 1, "abc123", 1)).await.unwrap();

        assert!(ledger.wait_for_receipt(&second).await.unwrap().is_success());
        assert_eq!(ledger.entry_count(), 1);
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn same_fingerprint_under_two_identifiers_is_allowed() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        ledger.send_transaction(register(&key, 0, "a", 7)).await.unwrap();
        ledger.send_transaction(register(&key, 1, "b", 7)).await.unwrap();
        assert_eq!(ledger.entry_count(), 2);
    }

    #[tokio::test]
    async fn nonce_must_match() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        ledger.send_transaction(register(&key, 0, "a", 1)).await.unwrap();

        let reused = ledger.send_transaction(register(&key, 0, "b", 1)).await;
        assert_eq!(reused, Err(ClientError::NonceMismatch { expected: 1, submitted: 0 }));

        let gap = ledger.send_transaction(register(&key, 5, "b", 1)).await;
        assert_eq!(gap, Err(ClientError::NonceMismatch { expected: 1, submitted: 5 }));

        assert_eq!(ledger.transaction_count(&key.submitter_id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn nonces_are_per_submitter() {
        let ledger = InMemoryLedger::default();
        let a = SigningKey::generate();
        let b = SigningKey::generate();
        ledger.send_transaction(register(&a, 0, "x", 1)).await.unwrap();
        ledger.send_transaction(register(&b, 0, "y", 1)).await.unwrap();
        assert_eq!(ledger.transaction_count(&a.submitter_id()).await.unwrap(), 1);
        assert_eq!(ledger.transaction_count(&b.submitter_id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn wrong_chain_is_rejected() {
        let ledger = InMemoryLedger::new(1);
        let key = SigningKey::generate();
        assert!(matches!(
            ledger.send_transaction(register(&key, 0, "a", 1)).await,
            Err(ClientError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn forged_signature_is_rejected() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        let mut tx = register(&key, 0, "a", 1);
        tx.public_key = SigningKey::generate().verifying_key().as_bytes();
        assert!(matches!(
            ledger.send_transaction(tx).await,
            Err(ClientError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn out_of_gas_reverts_and_consumes_nonce() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        let hash = ledger
            .send_transaction(register_with_gas(&key, 0, "a", 1, 30_000))
            .await
            .unwrap();

        let receipt = ledger.wait_for_receipt(&hash).await.unwrap();
        assert_eq!(
            receipt.status,
            ReceiptStatus::Reverted { reason: "out of gas".into() }
        );
        assert_eq!(ledger.entry_count(), 0);
        assert_eq!(ledger.transaction_count(&key.submitter_id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn intrinsic_gas_too_low_is_rejected_without_consuming_nonce() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        assert!(matches!(
            ledger.send_transaction(register_with_gas(&key, 0, "a", 1, 1_000)).await,
            Err(ClientError::Rejected(_))
        ));
        assert_eq!(ledger.transaction_count(&key.submitter_id()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn paused_mining_holds_receipts() {
        let ledger = std::sync::Arc::new(InMemoryLedger::default());
        let key = SigningKey::generate();
        ledger.pause_mining();
        let hash = ledger.send_transaction(register(&key, 0, "a", 1)).await.unwrap();
        assert_eq!(ledger.pending_count(), 1);
        assert_eq!(ledger.transaction_count(&key.submitter_id()).await.unwrap(), 1);

        let waiter = {
            let ledger = std::sync::Arc::clone(&ledger);
            tokio::spawn(async move { ledger.wait_for_receipt(&hash).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        assert_eq!(ledger.resume_mining(), 1);
        let receipt = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(receipt.is_success());
        assert_eq!(ledger.pending_count(), 0);
    }

    #[tokio::test]
    async fn chain_id_releases_state_and_follows_availability() {
        let ledger = InMemoryLedger::new(42);
        assert_eq!(ledger.chain_id().await.unwrap(), 42);
        // The state lock is free again right away.
        assert_eq!(ledger.block_number(), 0);

        ledger.set_unavailable(true);
        assert!(matches!(ledger.chain_id().await, Err(ClientError::Unavailable(_))));
        ledger.set_unavailable(false);
        assert_eq!(ledger.chain_id().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn unavailable_node_refuses_everything() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        ledger.set_unavailable(true);
        assert!(matches!(
            ledger.send_transaction(register(&key, 0, "a", 1)).await,
            Err(ClientError::Unavailable(_))
        ));
        assert!(matches!(
            ledger.call_view(&verify_call("a", 1)).await,
            Err(ClientError::Unavailable(_))
        ));
        ledger.set_unavailable(false);
        assert!(ledger.send_transaction(register(&key, 0, "a", 1)).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_receipt_is_reported() {
        let ledger = InMemoryLedger::default();
        let hash = TxHash::from_hash([4; 32]);
        assert_eq!(
            ledger.wait_for_receipt(&hash).await,
            Err(ClientError::UnknownTransaction(hash))
        );
    }

    #[tokio::test]
    async fn event_carries_entry() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        let mut events = ledger.subscribe(ITEM_REGISTERED).unwrap();
        let hash = ledger.send_transaction(register(&key, 0, "abc123", 3)).await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.name, ITEM_REGISTERED);
        assert_eq!(event.tx_hash, hash);
        assert_eq!(event.entry.identifier.as_str(), "abc123");
        assert_eq!(event.entry.submitter, key.submitter_id());
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        let ledger = InMemoryLedger::default();
        assert!(matches!(
            ledger.subscribe("ItemDeleted"),
            Err(ClientError::UnknownEvent(_))
        ));
    }
}
