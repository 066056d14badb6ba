use std::time::Duration;

use serde::{Deserialize, Serialize};

use anchor_ledger::ITEM_REGISTERED;

/// Retry policy of the anchor worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Registration attempts per delivery before giving up on it.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base_ms: 200,
            backoff_max_ms: 10_000,
        }
    }
}

impl WorkerConfig {
    /// Delay before retry number `retry` (1-based): exponential, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self.backoff_base_ms.saturating_mul(factor).min(self.backoff_max_ms);
        Duration::from_millis(ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub enabled: bool,
    /// Ledger event to follow.
    pub event: String,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            event: ITEM_REGISTERED.to_string(),
        }
    }
}

/// Reconciliation sweep schedule. No interval disables the sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub interval_secs: Option<u64>,
}

impl ReconcileConfig {
    pub fn interval(&self) -> Option<Duration> {
        self.interval_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }
}
