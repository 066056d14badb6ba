use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use anchor_service::AnchorNode;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// HTTP front end over one [`AnchorNode`].
pub struct AnchorServer {
    config: ServerConfig,
    node: Arc<AnchorNode>,
}

impl AnchorServer {
    pub fn new(config: ServerConfig, node: Arc<AnchorNode>) -> Self {
        Self { config, node }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.node.clone(), &self.config)
    }

    /// Serve requests until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("anchor server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
