//! Cloud Resource Manager v1 adapter for project IAM policies.

use std::sync::Arc;

use async_trait::async_trait;
use jit_cleaner_application::ResourcePolicyClient;
use jit_cleaner_core::{AppError, AppResult};
use jit_cleaner_domain::{CONDITIONAL_POLICY_VERSION, ResourcePolicy};
use serde::Serialize;
use tracing::debug;

use crate::access_token_source::AccessTokenSource;

/// Public Resource Manager REST endpoint.
pub const DEFAULT_RESOURCE_MANAGER_BASE_URL: &str = "https://cloudresourcemanager.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetIamPolicyRequest {
    options: GetPolicyOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetPolicyOptions {
    requested_policy_version: i32,
}

#[derive(Debug, Serialize)]
struct SetIamPolicyRequest<'a> {
    policy: &'a ResourcePolicy,
}

/// Project policy client backed by `projects.getIamPolicy` / `projects.setIamPolicy`.
#[derive(Clone)]
pub struct ResourceManagerPolicyClient {
    http_client: reqwest::Client,
    token_source: Arc<dyn AccessTokenSource>,
    base_url: String,
}

impl ResourceManagerPolicyClient {
    /// Creates a client against `base_url`.
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

    fn endpoint(&self, project_id: &str, method: &str) -> String {
        format!("{}/v1/projects/{project_id}:{method}", self.base_url)
    }

    async fn call<B>(&self, project_id: &str, method: &str, body: &B) -> AppResult<ResourcePolicy>
    where
        B: Serialize + Sync,
    {
        let token = self.token_source.access_token().await?;
        let response = self
            .http_client
            .post(self.endpoint(project_id, method))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|error| {
                AppError::PolicyAccess(format!(
                    "failed to call {method} for project '{project_id}': {error}"
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            let message = format!(
                "{method} for project '{project_id}' returned status {}: {body}",
                status.as_u16()
            );
            return Err(if status == reqwest::StatusCode::CONFLICT {
                AppError::Conflict(message)
            } else {
                AppError::PolicyAccess(message)
            });
        }

        response.json::<ResourcePolicy>().await.map_err(|error| {
            AppError::PolicyAccess(format!(
                "failed to parse {method} response for project '{project_id}': {error}"
            ))
        })
    }
}

#[async_trait]
impl ResourcePolicyClient for ResourceManagerPolicyClient {
    async fn get_policy(&self, resource: &str) -> AppResult<ResourcePolicy> {
        let policy = self
            .call(
                resource,
                "getIamPolicy",
                &GetIamPolicyRequest {
                    options: GetPolicyOptions {
                        requested_policy_version: CONDITIONAL_POLICY_VERSION,
                    },
                },
            )
            .await?;

        debug!(
            resource = %resource,
            bindings = policy.bindings.len(),
            etag = ?policy.etag,
            "fetched resource policy"
        );

        Ok(policy)
    }

    async fn set_policy(
        &self,
        resource: &str,
        policy: &ResourcePolicy,
    ) -> AppResult<ResourcePolicy> {
        if policy.etag.is_none() {
            return Err(AppError::Validation(format!(
                "refusing to write policy for project '{resource}' without an etag"
            )));
        }

        self.call(resource, "setIamPolicy", &SetIamPolicyRequest { policy })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jit_cleaner_application::ResourcePolicyClient;
    use jit_cleaner_core::AppError;
    use jit_cleaner_domain::ResourcePolicy;
    use serde_json::json;

    use super::{GetIamPolicyRequest, GetPolicyOptions, ResourceManagerPolicyClient};
    use crate::StaticAccessTokenSource;

    fn client() -> ResourceManagerPolicyClient {
        ResourceManagerPolicyClient::new(
            reqwest::Client::new(),
            Arc::new(StaticAccessTokenSource::new("token")),
            "https://cloudresourcemanager.googleapis.com/",
        )
    }

    #[test]
    fn builds_project_endpoints() {
        assert_eq!(
            client().endpoint("acme-prod", "getIamPolicy"),
            "https://cloudresourcemanager.googleapis.com/v1/projects/acme-prod:getIamPolicy"
        );
    }

    #[test]
    fn get_request_asks_for_conditional_policy_version() {
        let body = serde_json::to_value(GetIamPolicyRequest {
            options: GetPolicyOptions {
                requested_policy_version: 3,
            },
        });
        assert_eq!(
            body.ok(),
            Some(json!({ "options": { "requestedPolicyVersion": 3 } }))
        );
    }

    #[tokio::test]
    async fn set_policy_requires_etag() {
        let result = client()
            .set_policy("acme-prod", &ResourcePolicy::default())
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
