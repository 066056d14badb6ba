use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{info, warn};

use anchor_ledger::{EventStream, LedgerError, LedgerEvent, LedgerGateway};

/// Counters reported when an observer stops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObserverStats {
    pub observed: u64,
    /// Events dropped because the observer fell behind the stream.
    pub skipped: u64,
}

/// Follows ledger registration events and logs them for auditing.
///
/// Subscribes when started, so no event emitted after [`start`] returns is
/// missed unless the observer lags behind the stream's buffer. Purely
/// observational: it never affects anchoring or verification.
///
/// [`start`]: EventObserver::start
pub struct EventObserver {
    event: String,
    stream: EventStream,
}

impl EventObserver {
    pub fn start(gateway: &LedgerGateway, event: &str) -> Result<Self, LedgerError> {
        let stream = gateway.subscribe(event)?;
        info!(event, "observing ledger events");
        Ok(Self {
            event: event.to_string(),
            stream,
        })
    }

    /// Log events until `shutdown` flips or the stream ends.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ObserverStats {
        let mut stats = ObserverStats::default();
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                received = self.stream.recv() => match received {
                    Ok(event) => {
                        log_event(&event);
                        stats.observed += 1;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(event = %self.event, skipped, "observer lagged; events skipped");
                        stats.skipped += skipped;
                    }
                    Err(RecvError::Closed) => {
                        info!(event = %self.event, "event stream closed");
                        break;
                    }
                },
            }
        }
        info!(event = %self.event, observed = stats.observed, skipped = stats.skipped, "observer stopped");
        stats
    }
}

fn log_event(event: &LedgerEvent) {
    info!(
        event = %event.name,
        identifier = %event.entry.identifier,
        fingerprint = %event.entry.fingerprint,
        submitter = %event.entry.submitter,
        registered_at = event.entry.registered_at,
        block = event.block_number,
        tx_hash = %event.tx_hash,
        "ledger event"
    );
}
