//! OAuth access token sources for Google APIs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jit_cleaner_core::{AppError, AppResult};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
const DEFAULT_METADATA_BASE_URL: &str = "http://metadata.google.internal";
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for outbound API calls.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Returns a token valid for at least the next request.
    async fn access_token(&self) -> AppResult<String>;
}

/// Token source returning one fixed token, for local runs.
#[derive(Clone)]
pub struct StaticAccessTokenSource {
    token: String,
}

impl StaticAccessTokenSource {
    /// Creates a static token source.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenSource for StaticAccessTokenSource {
    async fn access_token(&self) -> AppResult<String> {
        if self.token.trim().is_empty() {
            return Err(AppError::Credential(
                "static access token is empty".to_owned(),
            ));
        }

        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Default credentials of the attached service account, read from the
/// compute metadata server and cached until shortly before expiry.
pub struct MetadataServerTokenSource {
    http_client: reqwest::Client,
    base_url: String,
    cached: RwLock<Option<CachedToken>>,
}

impl MetadataServerTokenSource {
    /// Creates a token source against the standard metadata server.
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self::with_base_url(http_client, DEFAULT_METADATA_BASE_URL)
    }

    /// Creates a token source against a custom metadata endpoint.
    #[must_use]
    pub fn with_base_url(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            cached: RwLock::new(None),
        }
    }

    async fn fetch_token(&self) -> AppResult<CachedToken> {
        let response = self
            .http_client
            .get(format!("{}{METADATA_TOKEN_PATH}", self.base_url))
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|error| {
                AppError::Credential(format!("failed to reach metadata server: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Credential(format!(
                "metadata server returned status {}: {body}",
                status.as_u16()
            )));
        }

        let token = response
            .json::<MetadataTokenResponse>()
            .await
            .map_err(|error| {
                AppError::Credential(format!("failed to parse metadata token response: {error}"))
            })?;

        debug!(expires_in = token.expires_in, "fetched access token");

        let now = Instant::now();
        let refresh_at = now
            .checked_add(Duration::from_secs(token.expires_in).saturating_sub(REFRESH_MARGIN))
            .unwrap_or(now);

        Ok(CachedToken {
            token: token.access_token,
            refresh_at,
        })
    }
}

#[async_trait]
impl AccessTokenSource for MetadataServerTokenSource {
    async fn access_token(&self) -> AppResult<String> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.refresh_at > Instant::now() {
                    return Ok(entry.token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        if let Some(entry) = cached.as_ref() {
            if entry.refresh_at > Instant::now() {
                return Ok(entry.token.clone());
            }
        }

        let entry = self.fetch_token().await?;
        let token = entry.token.clone();
        *cached = Some(entry);

        Ok(token)
    }
}
