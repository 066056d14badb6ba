use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use anchor_service::{AnchorNode, UpdateOutcome};
use anchor_types::{Record, RecordFields, RecordId};

use crate::error::{ServerError, ServerResult};

/// Timestamp format of `dt_update`: local time, microsecond precision.
pub const UPDATE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Body of `POST /update`.
#[derive(Clone, Debug, Deserialize)]
pub struct UpdateBody {
    pub numero_do_lote: String,
    pub status: String,
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Store a new lot status and request its anchoring.
pub async fn update_handler(
    State(node): State<Arc<AnchorNode>>,
    Json(body): Json<UpdateBody>,
) -> ServerResult<Json<Record>> {
    let updated_at = chrono::Local::now()
        .format(UPDATE_TIMESTAMP_FORMAT)
        .to_string();
    let fields = RecordFields::new(body.numero_do_lote, body.status, updated_at);
    match node.record_update(fields).await? {
        UpdateOutcome::Published(record) => Ok(Json(record)),
        UpdateOutcome::Pending { record, error } => {
            warn!(identifier = %record.id, error = %error, "record stored without anchor request");
            Err(ServerError::AnchoringPending(record.id))
        }
    }
}

pub async fn get_record_handler(
    State(node): State<Arc<AnchorNode>>,
    Path(id): Path<String>,
) -> ServerResult<Json<Record>> {
    let id = parse_id(&id)?;
    match node.find(&id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ServerError::NotFound(id)),
    }
}

pub async fn verify_handler(
    State(node): State<Arc<AnchorNode>>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    let id = parse_id(&id)?;
    let result = node.verify(&id).await?;
    Ok(Json(json!({ "_id": id, "result": result })))
}

fn parse_id(raw: &str) -> ServerResult<RecordId> {
    RecordId::parse(raw).map_err(|e| ServerError::InvalidIdentifier(e.to_string()))
}
