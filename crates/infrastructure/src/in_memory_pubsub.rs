//! In-memory queue adapter for local runs and tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jit_cleaner_application::{MessagePublisher, QueueMessage, QueueSubscriber};
use jit_cleaner_core::AppResult;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Message recorded by [`InMemoryPubSub::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    /// Topic the message was published to.
    pub topic: String,
    /// Published body.
    pub data: Vec<u8>,
    /// Published attributes.
    pub attributes: HashMap<String, String>,
}

#[derive(Default)]
struct InMemoryPubSubState {
    available: VecDeque<QueueMessage>,
    leased: HashMap<String, QueueMessage>,
    published: Vec<PublishedRecord>,
}

/// Single-subscription queue that leases pulled messages until acknowledged.
///
/// Leased messages are only handed out again after
/// [`InMemoryPubSub::redeliver_unacknowledged`], standing in for the ack deadline.
#[derive(Default)]
pub struct InMemoryPubSub {
    state: Mutex<InMemoryPubSubState>,
}

impl InMemoryPubSub {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a message available to subscribers and returns its id.
    pub async fn enqueue(
        &self,
        data: impl Into<Vec<u8>>,
        attributes: HashMap<String, String>,
        publish_time: DateTime<Utc>,
    ) -> String {
        let message_id = Uuid::new_v4().to_string();
        self.state.lock().await.available.push_back(QueueMessage {
            ack_id: String::new(),
            message_id: message_id.clone(),
            data: data.into(),
            attributes,
            publish_time,
        });
        message_id
    }

    /// Returns every message published so far.
    pub async fn published(&self) -> Vec<PublishedRecord> {
        self.state.lock().await.published.clone()
    }

    /// Returns the number of pulled but unacknowledged messages.
    pub async fn leased_count(&self) -> usize {
        self.state.lock().await.leased.len()
    }

    /// Returns the number of messages waiting to be pulled.
    pub async fn available_count(&self) -> usize {
        self.state.lock().await.available.len()
    }

    /// Moves unacknowledged messages back to the available queue.
    pub async fn redeliver_unacknowledged(&self) {
        let mut state = self.state.lock().await;
        let leased = std::mem::take(&mut state.leased);
        state.available.extend(leased.into_values());
    }
}

#[async_trait]
impl QueueSubscriber for InMemoryPubSub {
    async fn pull(&self, _subscription: &str, max_messages: usize) -> AppResult<Vec<QueueMessage>> {
        let mut state = self.state.lock().await;
        let count = max_messages.min(state.available.len());
        let mut messages = Vec::with_capacity(count);

        let drained: Vec<QueueMessage> = state.available.drain(..count).collect();
        for mut message in drained {
            message.ack_id = Uuid::new_v4().to_string();
            state.leased.insert(message.ack_id.clone(), message.clone());
            messages.push(message);
        }

        Ok(messages)
    }

    async fn acknowledge(&self, _subscription: &str, ack_ids: &[String]) -> AppResult<()> {
        let mut state = self.state.lock().await;
        for ack_id in ack_ids {
            state.leased.remove(ack_id);
        }

        Ok(())
    }
}

#[async_trait]
impl MessagePublisher for InMemoryPubSub {
    async fn publish(
        &self,
        topic: &str,
        data: &[u8],
        attributes: HashMap<String, String>,
    ) -> AppResult<String> {
        self.state.lock().await.published.push(PublishedRecord {
            topic: topic.to_owned(),
            data: data.to_vec(),
            attributes,
        });

        Ok(Uuid::new_v4().to_string())
    }
}
