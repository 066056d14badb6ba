use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::record::{Record, RecordFields, RecordId};

/// Queue message asking the anchor worker to register one record version.
///
/// Wire format (JSON):
///
/// ```json
/// {"_id": "abc123", "numero_do_lote": "L100", "status": "received", "dt_update": "2024-01-01T00:00:00"}
/// ```
///
/// Extra fields are ignored so that publishers may forward whole store
/// documents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnchorRequest {
    #[serde(rename = "_id")]
    pub identifier: RecordId,
    #[serde(flatten)]
    pub fields: RecordFields,
}

/// Why a queue payload could not be turned into an [`AnchorRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("malformed request: payload is not a JSON object with string fields: {0}")]
    InvalidJson(String),

    #[error("malformed request: missing required field `{0}`")]
    MissingField(&'static str),

    #[error("malformed request: field `{0}` contains control characters")]
    ControlCharacter(&'static str),

    #[error("malformed request: invalid identifier: {0}")]
    InvalidIdentifier(String),
}

#[derive(Deserialize)]
struct RawRequest {
    #[serde(rename = "_id")]
    id: Option<String>,
    numero_do_lote: Option<String>,
    status: Option<String>,
    dt_update: Option<String>,
}

impl AnchorRequest {
    pub fn from_record(record: &Record) -> Self {
        Self {
            identifier: record.id.clone(),
            fields: record.fields.clone(),
        }
    }

    /// Encode as the JSON queue payload.
    pub fn to_payload(&self) -> Vec<u8> {
        // Serializing strings into a JSON object cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode and validate a queue payload.
    ///
    /// Every field is required. Content fields must be free of control
    /// characters, since they are embedded verbatim in the fingerprint's
    /// canonical string and in ledger calls.
    pub fn parse(payload: &[u8]) -> Result<Self, RequestError> {
        let raw: RawRequest = serde_json::from_slice(payload)
            .map_err(|e| RequestError::InvalidJson(e.to_string()))?;

        let id = raw.id.ok_or(RequestError::MissingField("_id"))?;
        let lot_number = require("numero_do_lote", raw.numero_do_lote)?;
        let status = require("status", raw.status)?;
        let updated_at = require("dt_update", raw.dt_update)?;

        let identifier =
            RecordId::parse(id).map_err(|e| RequestError::InvalidIdentifier(e.to_string()))?;

        let fields = RecordFields {
            lot_number,
            status,
            updated_at,
        };
        fields.validate().map_err(|e| match e {
            TypeError::ControlCharacter(field) => RequestError::ControlCharacter(field),
            other => RequestError::InvalidJson(other.to_string()),
        })?;

        Ok(Self { identifier, fields })
    }
}

fn require(field: &'static str, value: Option<String>) -> Result<String, RequestError> {
    value.ok_or(RequestError::MissingField(field))
}
