use std::sync::Arc;

use tracing::{info, warn};

use anchor_queue::MessageQueue;
use anchor_types::{AnchorRequest, Record};

use crate::error::PublishError;

/// Hands anchor requests for freshly stored records to the queue.
///
/// Called right after a successful insert. A failure here leaves the record
/// stored without a pending request; the [`Reconciler`](crate::Reconciler)
/// picks such records up.
pub struct AnchorPublisher {
    queue: Arc<dyn MessageQueue>,
    topic: String,
}

impl AnchorPublisher {
    pub fn new(queue: Arc<dyn MessageQueue>, topic: impl Into<String>) -> Self {
        Self {
            queue,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Enqueue an anchor request for `record`.
    pub async fn publish(&self, record: &Record) -> Result<(), PublishError> {
        let request = AnchorRequest::from_record(record);
        self.queue
            .enqueue(&self.topic, request.to_payload())
            .await
            .map_err(|source| {
                warn!(identifier = %record.id, error = %source, "anchor request not enqueued");
                PublishError::Delivery {
                    identifier: record.id.clone(),
                    source,
                }
            })?;
        info!(identifier = %record.id, topic = %self.topic, "anchor request published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_queue::{InMemoryQueue, ANCHOR_TOPIC};
    use anchor_types::{RecordFields, RecordId};

    fn record() -> Record {
        Record::new(
            RecordId::parse("abc123").unwrap(),
            RecordFields::new("L100", "received", "2024-01-01T00:00:00"),
        )
    }

    #[tokio::test]
    async fn publishes_wire_message() {
        let queue = Arc::new(InMemoryQueue::default());
        let publisher = AnchorPublisher::new(queue.clone(), ANCHOR_TOPIC);
        publisher.publish(&record()).await.unwrap();

        let delivery = queue.try_dequeue(ANCHOR_TOPIC).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&delivery.payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "_id": "abc123",
                "numero_do_lote": "L100",
                "status": "received",
                "dt_update": "2024-01-01T00:00:00"
            })
        );
        assert_eq!(AnchorRequest::parse(&delivery.payload).unwrap(), AnchorRequest::from_record(&record()));
    }

    #[tokio::test]
    async fn enqueue_failure_is_surfaced() {
        let queue = Arc::new(InMemoryQueue::default());
        queue.close();
        let publisher = AnchorPublisher::new(queue, ANCHOR_TOPIC);
        let err = publisher.publish(&record()).await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::Delivery { ref identifier, .. } if identifier.as_str() == "abc123"
        ));
    }
}
