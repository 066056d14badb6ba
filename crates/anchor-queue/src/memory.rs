use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::traits::{Delivery, MessageQueue};

/// Configuration for the [`InMemoryQueue`].
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Largest accepted payload in bytes.
    pub max_payload_bytes: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 64 * 1024,
        }
    }
}

#[derive(Clone, Debug)]
struct Message {
    payload: Vec<u8>,
    redelivered: bool,
}

#[derive(Default)]
struct Topic {
    ready: VecDeque<Message>,
    unacked: HashMap<u64, Message>,
    dead_letters: Vec<Vec<u8>>,
}

#[derive(Default)]
struct QueueState {
    topics: HashMap<String, Topic>,
    next_tag: u64,
    closed: bool,
}

/// In-process broker with manual acknowledgement.
///
/// Delivered messages are held as unacked until settled. [`recover`]
/// simulates a consumer reconnect: every outstanding delivery goes back to
/// the front of its topic flagged as redelivered.
///
/// [`recover`]: InMemoryQueue::recover
pub struct InMemoryQueue {
    inner: Mutex<QueueState>,
    notify: Notify,
    config: QueueConfig,
}

impl InMemoryQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            config,
        }
    }

    /// Take the next ready message without waiting.
    pub fn try_dequeue(&self, topic: &str) -> QueueResult<Option<Delivery>> {
        let mut state = self.inner.lock().map_err(|_| QueueError::LockPoisoned)?;
        if state.closed {
            return Err(QueueError::Closed);
        }
        let tag = state.next_tag + 1;
        let Some(topic_state) = state.topics.get_mut(topic) else {
            return Ok(None);
        };
        let Some(message) = topic_state.ready.pop_front() else {
            return Ok(None);
        };
        let delivery = Delivery {
            tag,
            topic: topic.to_string(),
            payload: message.payload.clone(),
            redelivered: message.redelivered,
        };
        topic_state.unacked.insert(tag, message);
        state.next_tag = tag;
        debug!(topic, tag, redelivered = delivery.redelivered, "message delivered");
        Ok(Some(delivery))
    }

    /// Return every unacked delivery to its topic for redelivery.
    ///
    /// Returns the number of messages requeued.
    pub fn recover(&self) -> QueueResult<usize> {
        let mut state = self.inner.lock().map_err(|_| QueueError::LockPoisoned)?;
        let mut count = 0;
        for topic in state.topics.values_mut() {
            let mut outstanding: Vec<(u64, Message)> = topic.unacked.drain().collect();
            // Oldest delivery ends up at the front.
            outstanding.sort_by_key(|(tag, _)| std::cmp::Reverse(*tag));
            for (_, mut message) in outstanding {
                message.redelivered = true;
                topic.ready.push_front(message);
                count += 1;
            }
        }
        drop(state);
        if count > 0 {
            info!(count, "recovered unacked deliveries");
            self.notify.notify_waiters();
        }
        Ok(count)
    }

    /// Stop delivering. Pending and future `dequeue` calls fail with
    /// [`QueueError::Closed`].
    pub fn close(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.closed = true;
        }
        self.notify.notify_waiters();
    }

    /// Messages waiting for delivery on a topic.
    pub fn ready_len(&self, topic: &str) -> usize {
        self.with_topic(topic, |t| t.ready.len())
    }

    /// Delivered but not yet settled messages on a topic.
    pub fn unacked_len(&self, topic: &str) -> usize {
        self.with_topic(topic, |t| t.unacked.len())
    }

    /// Payloads dead-lettered on a topic, oldest first.
    pub fn dead_letters(&self, topic: &str) -> Vec<Vec<u8>> {
        self.with_topic(topic, |t| t.dead_letters.clone())
    }

    fn with_topic<T: Default>(&self, topic: &str, f: impl FnOnce(&Topic) -> T) -> T {
        self.inner
            .lock()
            .ok()
            .and_then(|state| state.topics.get(topic).map(f))
            .unwrap_or_default()
    }

    fn settle(&self, delivery: &Delivery) -> QueueResult<(std::sync::MutexGuard<'_, QueueState>, Message)> {
        let mut state = self.inner.lock().map_err(|_| QueueError::LockPoisoned)?;
        let message = state
            .topics
            .get_mut(&delivery.topic)
            .and_then(|t| t.unacked.remove(&delivery.tag))
            .ok_or_else(|| QueueError::UnknownDelivery {
                topic: delivery.topic.clone(),
                tag: delivery.tag,
            })?;
        Ok((state, message))
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn enqueue(&self, topic: &str, payload: Vec<u8>) -> QueueResult<()> {
        if payload.len() > self.config.max_payload_bytes {
            return Err(QueueError::PayloadTooLarge {
                size: payload.len(),
                limit: self.config.max_payload_bytes,
            });
        }
        {
            let mut state = self.inner.lock().map_err(|_| QueueError::LockPoisoned)?;
            if state.closed {
                return Err(QueueError::Closed);
            }
            state
                .topics
                .entry(topic.to_string())
                .or_default()
                .ready
                .push_back(Message {
                    payload,
                    redelivered: false,
                });
        }
        debug!(topic, "message enqueued");
        self.notify.notify_waiters();
        Ok(())
    }

    async fn dequeue(&self, topic: &str) -> QueueResult<Delivery> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a concurrent enqueue
            // between the check and the await still wakes us.
            notified.as_mut().enable();

            if let Some(delivery) = self.try_dequeue(topic)? {
                return Ok(delivery);
            }
            notified.await;
        }
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        drop(self.settle(delivery)?);
        debug!(topic = %delivery.topic, tag = delivery.tag, "delivery acked");
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, requeue: bool) -> QueueResult<()> {
        let (mut state, mut message) = self.settle(delivery)?;
        let topic = state.topics.entry(delivery.topic.clone()).or_default();
        if requeue {
            message.redelivered = true;
            topic.ready.push_front(message);
        } else {
            topic.dead_letters.push(message.payload);
        }
        drop(state);

        if requeue {
            debug!(topic = %delivery.topic, tag = delivery.tag, "delivery requeued");
            self.notify.notify_waiters();
        } else {
            warn!(topic = %delivery.topic, tag = delivery.tag, "delivery dead-lettered");
        }
        Ok(())
    }
}
