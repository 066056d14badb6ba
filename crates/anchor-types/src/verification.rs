use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of verifying a stored record against the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// The record's current fingerprint is registered under its identifier.
    Valid,
    /// The identifier has ledger entries, but none matches the current
    /// content: the record changed after it was anchored.
    Invalid,
    /// No record with this identifier exists in the document store.
    NotFound,
    /// The record exists but nothing has been registered for it yet.
    NotAnchored,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::NotFound => "not_found",
            Self::NotAnchored => "not_anchored",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
