use anchor_types::TxHash;

/// Errors reported by a ledger node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The node could not be reached or did not answer.
    #[error("ledger node unavailable: {0}")]
    Unavailable(String),

    /// The transaction's sequence number is not the one the node expects
    /// next for the sender.
    #[error("nonce mismatch: expected {expected}, submitted {submitted}")]
    NonceMismatch { expected: u64, submitted: u64 },

    /// The node refused the transaction before inclusion.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),

    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

/// Result alias for ledger node operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors produced by [`LedgerGateway`](crate::LedgerGateway) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The ledger refused or reverted the registration.
    #[error("ledger write failed: {reason}")]
    WriteFailed { reason: String },

    /// Network or node failure; the write was not accepted.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The sequence number was already used. The gateway refreshes its
    /// sequence state before the next submission.
    #[error("sequence collision: ledger expected nonce {expected}, submitted {submitted}")]
    SequenceCollision { expected: u64, submitted: u64 },

    /// The transaction was accepted but not confirmed in time. It may
    /// still be included later.
    #[error("outcome unknown for transaction {tx_hash}: confirmation timed out")]
    OutcomeUnknown { tx_hash: TxHash },

    #[error("unexpected ledger response: {0}")]
    UnexpectedResponse(String),
}

impl LedgerError {
    /// Whether the caller should check `verify` before resubmitting,
    /// because an earlier attempt may have landed.
    pub fn needs_reverify(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::OutcomeUnknown { .. } | Self::SequenceCollision { .. }
        )
    }
}

/// Result alias for gateway operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
