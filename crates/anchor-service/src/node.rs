use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use anchor_ledger::{LedgerError, LedgerGateway};
use anchor_queue::MessageQueue;
use anchor_store::{DocumentStore, StoreResult};
use anchor_types::{Record, RecordFields, RecordId, VerificationStatus};

use crate::config::{ObserverConfig, ReconcileConfig, WorkerConfig};
use crate::error::{PublishError, UpdateError, VerifyError};
use crate::observer::EventObserver;
use crate::publisher::AnchorPublisher;
use crate::reconcile::Reconciler;
use crate::verifier::Verifier;
use crate::worker::AnchorWorker;

/// Result of storing a new record version.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Stored, and its anchor request is on the queue.
    Published(Record),
    /// Stored, but the anchor request could not be enqueued. The record
    /// stays unanchored until a reconciliation sweep republishes it.
    Pending { record: Record, error: PublishError },
}

impl UpdateOutcome {
    pub fn record(&self) -> &Record {
        match self {
            Self::Published(record) | Self::Pending { record, .. } => record,
        }
    }
}

/// One anchoring deployment: a document store, a queue, and a ledger
/// gateway, plus the policies of the background tasks that connect them.
pub struct AnchorNode {
    store: Arc<dyn DocumentStore>,
    queue: Arc<dyn MessageQueue>,
    gateway: Arc<LedgerGateway>,
    topic: String,
    worker_config: WorkerConfig,
    observer_config: ObserverConfig,
    reconcile_config: ReconcileConfig,
}

impl AnchorNode {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        queue: Arc<dyn MessageQueue>,
        gateway: Arc<LedgerGateway>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            queue,
            gateway,
            topic: topic.into(),
            worker_config: WorkerConfig::default(),
            observer_config: ObserverConfig::default(),
            reconcile_config: ReconcileConfig::default(),
        }
    }

    pub fn with_worker_config(mut self, config: WorkerConfig) -> Self {
        self.worker_config = config;
        self
    }

    pub fn with_observer_config(mut self, config: ObserverConfig) -> Self {
        self.observer_config = config;
        self
    }

    pub fn with_reconcile_config(mut self, config: ReconcileConfig) -> Self {
        self.reconcile_config = config;
        self
    }

    // ---- Accessors ----

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<LedgerGateway> {
        &self.gateway
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publisher(&self) -> AnchorPublisher {
        AnchorPublisher::new(self.queue.clone(), self.topic.clone())
    }

    pub fn worker(&self) -> AnchorWorker {
        AnchorWorker::new(
            self.queue.clone(),
            self.gateway.clone(),
            self.topic.clone(),
            self.worker_config.clone(),
        )
    }

    pub fn verifier(&self) -> Verifier {
        Verifier::new(self.store.clone(), self.gateway.clone())
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.store.clone(), self.gateway.clone(), self.publisher())
    }

    pub fn observer(&self) -> Result<EventObserver, LedgerError> {
        EventObserver::start(&self.gateway, &self.observer_config.event)
    }

    // ---- Record operations ----

    /// Store a new record version and request its anchoring.
    ///
    /// Fields that could never be anchored are refused before storing. A
    /// store failure is returned as an error. A publish failure is not:
    /// the record is already stored, so it is reported as
    /// [`UpdateOutcome::Pending`].
    pub async fn record_update(&self, fields: RecordFields) -> Result<UpdateOutcome, UpdateError> {
        fields.validate()?;
        let id = self.store.insert(fields.clone()).await?;
        let record = Record::new(id, fields);
        match self.publisher().publish(&record).await {
            Ok(()) => Ok(UpdateOutcome::Published(record)),
            Err(error) => Ok(UpdateOutcome::Pending { record, error }),
        }
    }

    pub async fn find(&self, identifier: &RecordId) -> StoreResult<Option<Record>> {
        self.store.find(identifier).await
    }

    pub async fn verify(&self, identifier: &RecordId) -> Result<VerificationStatus, VerifyError> {
        self.verifier().verify_record(identifier).await
    }

    // ---- Background tasks ----

    /// Start the worker, plus the observer and reconciler when configured.
    pub fn spawn(&self) -> NodeHandle {
        let (shutdown, rx) = watch::channel(false);
        let mut tasks = Vec::new();

        let worker = self.worker();
        let worker_rx = rx.clone();
        tasks.push((
            "worker",
            tokio::spawn(async move {
                if let Err(e) = worker.run(worker_rx).await {
                    error!(error = %e, "anchor worker stopped on queue error");
                }
            }),
        ));

        if self.observer_config.enabled {
            match self.observer() {
                Ok(observer) => {
                    let observer_rx = rx.clone();
                    tasks.push((
                        "observer",
                        tokio::spawn(async move {
                            observer.run(observer_rx).await;
                        }),
                    ));
                }
                Err(e) => warn!(error = %e, "event observer not started"),
            }
        }

        if let Some(interval) = self.reconcile_config.interval() {
            let reconciler = self.reconciler();
            let reconcile_rx = rx.clone();
            tasks.push((
                "reconciler",
                tokio::spawn(async move { reconciler.run(interval, reconcile_rx).await }),
            ));
        }

        info!(tasks = tasks.len(), topic = %self.topic, "anchor node started");
        NodeHandle { shutdown, tasks }
    }
}

/// Running background tasks of an [`AnchorNode`].
pub struct NodeHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl NodeHandle {
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|(name, _)| *name).collect()
    }

    /// Signal every task to stop and wait for them.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                error!(task = name, error = %e, "background task panicked");
            }
        }
        info!("anchor node stopped");
    }
}
