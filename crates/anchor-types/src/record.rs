use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest identifier accepted from outside the store.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Store-assigned opaque identifier of a record.
///
/// The anchoring protocol never interprets identifiers; it only requires
/// that they survive a round trip through the queue and the ledger as
/// strings, which rules out empty values and control characters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Validate and wrap an identifier received from outside.
    pub fn parse(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if s.is_empty() {
            return Err(TypeError::InvalidIdentifier("empty identifier".into()));
        }
        if s.len() > MAX_IDENTIFIER_LEN {
            return Err(TypeError::InvalidIdentifier(format!(
                "identifier longer than {MAX_IDENTIFIER_LEN} bytes"
            )));
        }
        if s.chars().any(char::is_control) {
            return Err(TypeError::InvalidIdentifier(
                "identifier contains control characters".into(),
            ));
        }
        Ok(Self(s))
    }

    /// Generate a fresh identifier (UUID v7, simple hex form).
    ///
    /// v7 identifiers sort by creation time, which keeps store listings
    /// in insertion order.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The content fields of a record: exactly the fields covered by its
/// fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    #[serde(rename = "numero_do_lote")]
    pub lot_number: String,
    pub status: String,
    /// ISO-8601 update timestamp, kept as the exact string that was stored.
    #[serde(rename = "dt_update")]
    pub updated_at: String,
}

impl RecordFields {
    pub fn new(
        lot_number: impl Into<String>,
        status: impl Into<String>,
        updated_at: impl Into<String>,
    ) -> Self {
        Self {
            lot_number: lot_number.into(),
            status: status.into(),
            updated_at: updated_at.into(),
        }
    }

    /// Reject content that cannot be embedded in the fingerprint's
    /// canonical string. Reports the first offending field by its wire name.
    pub fn validate(&self) -> Result<(), TypeError> {
        let fields = [
            ("numero_do_lote", &self.lot_number),
            ("status", &self.status),
            ("dt_update", &self.updated_at),
        ];
        for (name, value) in fields {
            if value.chars().any(char::is_control) {
                return Err(TypeError::ControlCharacter(name));
            }
        }
        Ok(())
    }
}

/// A mutable status record held by the document store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: RecordFields,
}

impl Record {
    pub fn new(id: RecordId, fields: RecordFields) -> Self {
        Self { id, fields }
    }
}
