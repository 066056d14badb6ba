use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use anchor_crypto::SigningKey;
use anchor_ledger::GatewayConfig;
use anchor_queue::{QueueConfig, ANCHOR_TOPIC};
use anchor_server::ServerConfig;
use anchor_service::{ObserverConfig, ReconcileConfig, WorkerConfig};

/// Environment variable holding the submitter's signing key (64 hex chars).
pub const SIGNING_KEY_ENV: &str = "ANCHOR_SIGNING_KEY";

/// Configuration of an `anchor run` node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub server: ServerConfig,
    pub queue: QueueSection,
    pub ledger: LedgerSection,
    pub worker: WorkerConfig,
    pub observer: ObserverConfig,
    pub reconcile: ReconcileConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    pub topic: String,
    pub max_payload_bytes: usize,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            topic: ANCHOR_TOPIC.to_string(),
            max_payload_bytes: QueueConfig::default().max_payload_bytes,
        }
    }
}

impl QueueSection {
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_payload_bytes: self.max_payload_bytes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// Chain id of the embedded ledger.
    pub chain_id: u64,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub confirmation_timeout_ms: u64,
}

impl Default for LedgerSection {
    fn default() -> Self {
        let gateway = GatewayConfig::default();
        Self {
            chain_id: 1337,
            gas_limit: gateway.gas_limit,
            gas_price: gateway.gas_price,
            confirmation_timeout_ms: gateway.confirmation_timeout.as_millis() as u64,
        }
    }
}

impl LedgerSection {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
            confirmation_timeout: Duration::from_millis(self.confirmation_timeout_ms),
        }
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Signing key from `ANCHOR_SIGNING_KEY`, or a fresh one when unset.
pub fn signing_key_from_env() -> anyhow::Result<SigningKey> {
    match std::env::var(SIGNING_KEY_ENV) {
        Ok(hex) => SigningKey::from_hex(&hex)
            .map_err(|e| anyhow::anyhow!("{SIGNING_KEY_ENV}: {e}")),
        Err(_) => {
            let key = SigningKey::generate();
            warn!(
                submitter = %key.submitter_id(),
                "{SIGNING_KEY_ENV} not set; using an ephemeral signing key"
            );
            Ok(key)
        }
    }
}
