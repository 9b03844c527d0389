use async_trait::async_trait;
use jit_cleaner_core::AppResult;
use jit_cleaner_domain::ResourcePolicy;

/// Port for reading and replacing resource IAM policies.
#[async_trait]
pub trait ResourcePolicyClient: Send + Sync {
    /// Fetches the current policy, requesting conditional binding support.
    async fn get_policy(&self, resource: &str) -> AppResult<ResourcePolicy>;

    /// Replaces the policy.
    ///
    /// Implementations send the policy etag and fail with `AppError::Conflict`
    /// when the stored policy changed since it was read.
    async fn set_policy(&self, resource: &str, policy: &ResourcePolicy)
    -> AppResult<ResourcePolicy>;
}
