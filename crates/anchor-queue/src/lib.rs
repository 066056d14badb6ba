//! Message queue boundary for the lot anchoring service.
//!
//! Anchor requests travel from the publisher to the anchor worker through a
//! broker that is an external collaborator. The core relies on three
//! capabilities: enqueue on a topic, dequeue the next delivery, and settle
//! a delivery with an ack (done) or a nack (failed, optionally requeued).
//! A delivery that is never settled is redelivered after the consumer's
//! connection is recovered, so consumers must be idempotent.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{QueueError, QueueResult};
pub use memory::{InMemoryQueue, QueueConfig};
pub use traits::{Delivery, MessageQueue};

/// Topic shared by the anchor publisher and the anchor worker.
pub const ANCHOR_TOPIC: &str = "produtos.lote.update";
