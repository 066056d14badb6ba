use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use anchor_service::{UpdateError, VerifyError};
use anchor_store::StoreError;
use anchor_types::{RecordId, TypeError};

/// Failures of an HTTP request. Each maps to a status code and a generic
/// `{"detail": ...}` body; internal error text is logged, never returned.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Update content that cannot be fingerprinted as given.
    #[error("invalid field: {0}")]
    InvalidField(TypeError),

    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The record was stored, but its anchor request was not enqueued.
    #[error("anchoring pending for {0}")]
    AnchoringPending(RecordId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("verification error: {0}")]
    Verify(#[from] VerifyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl From<UpdateError> for ServerError {
    fn from(e: UpdateError) -> Self {
        match e {
            UpdateError::InvalidFields(e) => Self::InvalidField(e),
            UpdateError::Store(e) => Self::Store(e),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::InvalidIdentifier(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": "Invalid identifier format" }),
            ),
            Self::InvalidField(e) => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": format!("Invalid field value: {e}") }),
            ),
            Self::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "detail": "Document not found" }),
            ),
            Self::AnchoringPending(id) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "detail": "anchoring pending", "_id": id }),
            ),
            Self::Verify(VerifyError::Ledger(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "detail": "verification unavailable" }),
            ),
            Self::Store(_) | Self::Verify(VerifyError::Store(_)) | Self::Io(_) | Self::Internal(_) => {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "internal error" }),
                )
            }
        };
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        }
        (status, Json(body)).into_response()
    }
}
