//! Pub/Sub v1 REST adapter for the queue ports.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use jit_cleaner_application::{MessagePublisher, QueueMessage, QueueSubscriber};
use jit_cleaner_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::access_token_source::AccessTokenSource;

/// Public Pub/Sub REST endpoint.
pub const DEFAULT_PUBSUB_BASE_URL: &str = "https://pubsub.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequest {
    max_messages: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullResponse {
    #[serde(default)]
    received_messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceivedMessage {
    ack_id: String,
    message: PubsubMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PubsubMessage {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    attributes: HashMap<String, String>,
    message_id: String,
    publish_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgeRequest<'a> {
    ack_ids: &'a [String],
}

#[derive(Debug, Serialize)]
struct PublishRequest {
    messages: Vec<OutboundMessage>,
}

#[derive(Debug, Serialize)]
struct OutboundMessage {
    data: String,
    attributes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmptyResponse {}

/// Subscriber and publisher backed by the Pub/Sub REST API.
#[derive(Clone)]
pub struct PubSubRestClient {
    http_client: reqwest::Client,
    token_source: Arc<dyn AccessTokenSource>,
    base_url: String,
}

impl PubSubRestClient {
    /// Creates a client against `base_url`, e.g. [`DEFAULT_PUBSUB_BASE_URL`] or an emulator.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        token_source: Arc<dyn AccessTokenSource>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            token_source,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn endpoint(&self, resource: &str, method: &str) -> String {
        format!(
            "{}/v1/{}:{method}",
            self.base_url,
            resource.trim_start_matches('/')
        )
    }

    async fn call<B, R>(&self, resource: &str, method: &str, body: &B) -> AppResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let token = self.token_source.access_token().await?;
        let response = self
            .http_client
            .post(self.endpoint(resource, method))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|error| {
                AppError::Queue(format!("failed to call pubsub {method} on '{resource}': {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Queue(format!(
                "pubsub {method} on '{resource}' returned status {}: {body}",
                status.as_u16()
            )));
        }

        response.json::<R>().await.map_err(|error| {
            AppError::Queue(format!(
                "failed to parse pubsub {method} response for '{resource}': {error}"
            ))
        })
    }
}

impl ReceivedMessage {
    /// Undecodable data is passed through as its raw text so routing
    /// quarantines that one message instead of failing the whole pull.
    fn into_queue_message(self) -> QueueMessage {
        let data = match self.message.data {
            Some(encoded) => match STANDARD.decode(encoded.as_bytes()) {
                Ok(decoded) => decoded,
                Err(error) => {
                    warn!(
                        message_id = %self.message.message_id,
                        error = %error,
                        "message carries invalid base64 data"
                    );
                    encoded.into_bytes()
                }
            },
            None => Vec::new(),
        };

        QueueMessage {
            ack_id: self.ack_id,
            message_id: self.message.message_id,
            data,
            attributes: self.message.attributes,
            publish_time: self.message.publish_time,
        }
    }
}

#[async_trait]
impl QueueSubscriber for PubSubRestClient {
    async fn pull(&self, subscription: &str, max_messages: usize) -> AppResult<Vec<QueueMessage>> {
        let response: PullResponse = self
            .call(subscription, "pull", &PullRequest { max_messages })
            .await?;

        debug!(
            subscription = %subscription,
            received = response.received_messages.len(),
            "pulled messages"
        );

        Ok(response
            .received_messages
            .into_iter()
            .map(ReceivedMessage::into_queue_message)
            .collect())
    }

    async fn acknowledge(&self, subscription: &str, ack_ids: &[String]) -> AppResult<()> {
        if ack_ids.is_empty() {
            return Ok(());
        }

        let _: EmptyResponse = self
            .call(subscription, "acknowledge", &AcknowledgeRequest { ack_ids })
            .await?;

        Ok(())
    }
}

#[async_trait]
impl MessagePublisher for PubSubRestClient {
    async fn publish(
        &self,
        topic: &str,
        data: &[u8],
        attributes: HashMap<String, String>,
    ) -> AppResult<String> {
        let response: PublishResponse = self
            .call(
                topic,
                "publish",
                &PublishRequest {
                    messages: vec![OutboundMessage {
                        data: STANDARD.encode(data),
                        attributes,
                    }],
                },
            )
            .await?;

        response.message_ids.into_iter().next().ok_or_else(|| {
            AppError::Queue(format!("pubsub publish on '{topic}' returned no message id"))
        })
    }
}
