use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jit_cleaner_core::AppResult;
use jit_cleaner_domain::{MessageOrigin, ORIGIN_ATTRIBUTE};

/// Message pulled from a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Handle used to acknowledge this delivery.
    pub ack_id: String,
    /// Server-assigned message id, stable across redeliveries.
    pub message_id: String,
    /// Raw message body.
    pub data: Vec<u8>,
    /// String attributes attached by the publisher.
    pub attributes: HashMap<String, String>,
    /// Time the message was published.
    pub publish_time: DateTime<Utc>,
}

impl QueueMessage {
    /// Returns the parsed origin tag, or `None` when the attribute is absent.
    #[must_use]
    pub fn origin(&self) -> Option<MessageOrigin> {
        self.attributes
            .get(ORIGIN_ATTRIBUTE)
            .map(|value| MessageOrigin::from_attribute(value))
    }
}

/// Port for pulling and acknowledging subscription messages.
#[async_trait]
pub trait QueueSubscriber: Send + Sync {
    /// Pulls at most `max_messages` messages; an empty result means the subscription is drained.
    async fn pull(&self, subscription: &str, max_messages: usize) -> AppResult<Vec<QueueMessage>>;

    /// Acknowledges the given deliveries in one call.
    async fn acknowledge(&self, subscription: &str, ack_ids: &[String]) -> AppResult<()>;
}

/// Port for publishing messages to a topic.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publishes `data` with `attributes` and returns the server message id.
    async fn publish(
        &self,
        topic: &str,
        data: &[u8],
        attributes: HashMap<String, String>,
    ) -> AppResult<String>;
}
