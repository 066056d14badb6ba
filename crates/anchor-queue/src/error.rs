/// Errors produced by queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The broker could not be reached.
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// The queue has been closed and will deliver nothing more.
    #[error("queue is closed")]
    Closed,

    /// Ack or nack for a delivery the queue does not consider outstanding.
    #[error("unknown delivery tag {tag} on topic {topic}")]
    UnknownDelivery { topic: String, tag: u64 },

    /// Payload exceeds the configured limit.
    #[error("payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("queue lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout the queue crate.
pub type QueueResult<T> = std::result::Result<T, QueueError>;
