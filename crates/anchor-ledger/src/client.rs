use async_trait::async_trait;
use tokio::sync::broadcast;

use anchor_types::{SubmitterId, TxHash};

use crate::error::ClientResult;
use crate::transaction::{LedgerEvent, SignedTransaction, TransactionReceipt, ViewCall, ViewValue};

/// A broadcast receiver of ledger events.
pub type EventStream = broadcast::Receiver<LedgerEvent>;

/// Capabilities of a ledger node consumed by the anchoring core.
///
/// Submitting a write is split into `send_transaction` (the node accepts
/// or refuses the signed transaction) and `wait_for_receipt` (inclusion),
/// so that callers can bound the wait separately from rejection.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn chain_id(&self) -> ClientResult<u64>;

    /// Next sequence number the node expects from `submitter`, counting
    /// transactions that are accepted but not yet included.
    async fn transaction_count(&self, submitter: &SubmitterId) -> ClientResult<u64>;

    /// Hand a signed transaction to the node. Returns its hash once the
    /// node has accepted it for inclusion.
    async fn send_transaction(&self, tx: SignedTransaction) -> ClientResult<TxHash>;

    /// Wait until the transaction is included and return its receipt.
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> ClientResult<TransactionReceipt>;

    /// Evaluate a read-only call against current state.
    async fn call_view(&self, call: &ViewCall) -> ClientResult<ViewValue>;

    /// Stream of events with the given name, starting now.
    fn subscribe(&self, event_name: &str) -> ClientResult<EventStream>;
}
