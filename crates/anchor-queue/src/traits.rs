use async_trait::async_trait;

use crate::error::QueueResult;

/// One delivery of a queued message to a consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Broker-assigned tag used to settle this delivery.
    pub tag: u64,
    pub topic: String,
    pub payload: Vec<u8>,
    /// `true` if this message was delivered before and never acked.
    pub redelivered: bool,
}

/// Queue capabilities consumed by the anchoring core.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Append a message to a topic.
    async fn enqueue(&self, topic: &str, payload: Vec<u8>) -> QueueResult<()>;

    /// Wait for the next message on a topic.
    ///
    /// The message stays outstanding until it is acked or nacked.
    async fn dequeue(&self, topic: &str) -> QueueResult<Delivery>;

    /// Settle a delivery as processed. It will not be delivered again.
    async fn ack(&self, delivery: &Delivery) -> QueueResult<()>;

    /// Settle a delivery as failed.
    ///
    /// With `requeue` the message goes back to the head of the topic;
    /// without it the message is dead-lettered.
    async fn nack(&self, delivery: &Delivery, requeue: bool) -> QueueResult<()>;
}
