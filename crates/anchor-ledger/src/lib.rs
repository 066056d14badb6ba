//! Append-only anchor ledger boundary for the lot anchoring service.
//!
//! The ledger itself is an external collaborator with its own consensus.
//! This crate provides:
//! - Transaction, receipt, view and event types mirroring the anchor
//!   contract (`registerItem`, `verifyItem`, `items`, `ItemRegistered`)
//! - The [`LedgerClient`] trait boundary for talking to a ledger node
//! - [`InMemoryLedger`], an automining single-node chain for tests and demos
//! - [`LedgerGateway`], the sole owner of the submitter's sequence numbers,
//!   exposing `register`, `verify` and `lookup`

pub mod client;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod transaction;

pub use client::{EventStream, LedgerClient};
pub use error::{ClientError, ClientResult, LedgerError, LedgerResult};
pub use gateway::{GatewayConfig, LedgerGateway};
pub use memory::InMemoryLedger;
pub use transaction::{
    LedgerCall, LedgerEvent, ReceiptStatus, SignedTransaction, TransactionBody,
    TransactionReceipt, ViewCall, ViewValue, ITEM_REGISTERED,
};
