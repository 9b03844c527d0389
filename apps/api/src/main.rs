//! JIT cleaner API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod error;
mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use jit_cleaner_application::{
    DrainService, MessageRouter, PolicyBindingService, QueueSubscriber, Republisher,
    ResourcePolicyClient,
};
use jit_cleaner_core::AppError;
use jit_cleaner_infrastructure::{
    AccessTokenSource, MetadataServerTokenSource, PubSubRestClient, ResourceManagerPolicyClient,
    StaticAccessTokenSource,
};
use tracing::info;

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build http client: {error}")))?;

    let token_source: Arc<dyn AccessTokenSource> = match config.static_access_token.clone() {
        Some(token) => {
            info!("using static access token from GOOGLE_OAUTH_ACCESS_TOKEN");
            Arc::new(StaticAccessTokenSource::new(token))
        }
        None => Arc::new(MetadataServerTokenSource::new(http_client.clone())),
    };

    let pubsub = Arc::new(PubSubRestClient::new(
        http_client.clone(),
        token_source.clone(),
        config.pubsub_base_url.as_str(),
    ));
    let policy_client: Arc<dyn ResourcePolicyClient> = Arc::new(ResourceManagerPolicyClient::new(
        http_client,
        token_source,
        config.resource_manager_base_url.as_str(),
    ));

    let republisher = Republisher::new(pubsub.clone(), config.topic_path.clone());
    let router = MessageRouter::new(PolicyBindingService::new(policy_client), republisher.clone());
    let subscriber: Arc<dyn QueueSubscriber> = pubsub;

    let app_state = AppState {
        drain_service: DrainService::new(subscriber, router, republisher),
        subscription_path: config.subscription_path.clone(),
        batch_size: config.batch_size,
    };

    let app = api_router::build_router(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind {address}: {error}")))?;

    info!(
        %address,
        project_id = %config.project_id,
        topic = %config.topic_path,
        subscription = %config.subscription_path,
        batch_size = config.batch_size,
        "jit cleaner listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("server error: {error}")))
}
