use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use anchor_service::AnchorNode;

use crate::config::ServerConfig;
use crate::handler;

/// Build the axum router with all anchoring endpoints.
pub fn build_router(node: Arc<AnchorNode>, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/update", post(handler::update_handler))
        .route("/verify/:id", get(handler::verify_handler))
        .route("/:id", get(handler::get_record_handler))
        .with_state(node)
        .layer(TraceLayer::new_for_http());
    if config.permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
