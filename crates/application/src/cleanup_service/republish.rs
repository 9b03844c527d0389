use std::collections::HashMap;
use std::sync::Arc;

use jit_cleaner_core::AppResult;
use jit_cleaner_domain::{MessageOrigin, ORIGIN_ATTRIBUTE};
use tracing::info;

use crate::cleanup_ports::MessagePublisher;

/// Re-emits original message bodies to the cleaner topic under a new origin.
#[derive(Clone)]
pub struct Republisher {
    publisher: Arc<dyn MessagePublisher>,
    topic: String,
}

impl Republisher {
    /// Creates a republisher bound to one topic.
    #[must_use]
    pub fn new(publisher: Arc<dyn MessagePublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    /// Publishes `payload` byte-for-byte tagged with `origin`.
    pub async fn republish(&self, payload: &[u8], origin: MessageOrigin) -> AppResult<String> {
        let attributes = HashMap::from([(ORIGIN_ATTRIBUTE.to_owned(), origin.as_str().to_owned())]);
        let message_id = self
            .publisher
            .publish(self.topic.as_str(), payload, attributes)
            .await?;

        info!(
            topic = %self.topic,
            origin = %origin,
            message_id = %message_id,
            "republished message"
        );

        Ok(message_id)
    }

    /// Moves `payload` to the error origin.
    pub async fn quarantine(&self, payload: &[u8]) -> AppResult<String> {
        self.republish(payload, MessageOrigin::Error).await
    }
}
