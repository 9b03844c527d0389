//! In-memory resource policy adapter enforcing etag checks.

use std::collections::HashMap;

use async_trait::async_trait;
use jit_cleaner_application::ResourcePolicyClient;
use jit_cleaner_core::{AppError, AppResult};
use jit_cleaner_domain::{CONDITIONAL_POLICY_VERSION, PolicyBinding, ResourcePolicy};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
struct StoredPolicy {
    bindings: Vec<PolicyBinding>,
    revision: u64,
}

impl StoredPolicy {
    fn etag(&self) -> String {
        format!("rev-{}", self.revision)
    }

    fn to_policy(&self) -> ResourcePolicy {
        ResourcePolicy {
            version: Some(CONDITIONAL_POLICY_VERSION),
            etag: Some(self.etag()),
            bindings: self.bindings.clone(),
        }
    }
}

/// Policy store keyed by resource id.
#[derive(Default)]
pub struct InMemoryPolicyStore {
    policies: RwLock<HashMap<String, StoredPolicy>>,
}

impl InMemoryPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the bindings of `resource`, bumping its etag.
    pub async fn put_bindings(&self, resource: &str, bindings: Vec<PolicyBinding>) {
        let mut policies = self.policies.write().await;
        let stored = policies.entry(resource.to_owned()).or_default();
        stored.bindings = bindings;
        stored.revision += 1;
    }

    /// Returns the current bindings of `resource`.
    pub async fn bindings(&self, resource: &str) -> Vec<PolicyBinding> {
        self.policies
            .read()
            .await
            .get(resource)
            .map(|stored| stored.bindings.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResourcePolicyClient for InMemoryPolicyStore {
    async fn get_policy(&self, resource: &str) -> AppResult<ResourcePolicy> {
        Ok(self
            .policies
            .read()
            .await
            .get(resource)
            .cloned()
            .unwrap_or_default()
            .to_policy())
    }

    async fn set_policy(
        &self,
        resource: &str,
        policy: &ResourcePolicy,
    ) -> AppResult<ResourcePolicy> {
        let mut policies = self.policies.write().await;
        let stored = policies.entry(resource.to_owned()).or_default();

        if policy.etag.as_deref() != Some(stored.etag().as_str()) {
            return Err(AppError::Conflict(format!(
                "policy for '{resource}' changed since it was read"
            )));
        }

        stored.bindings = policy.bindings.clone();
        stored.revision += 1;

        Ok(stored.to_policy())
    }
}

#[cfg(test)]
mod tests {
    use jit_cleaner_application::ResourcePolicyClient;
    use jit_cleaner_core::AppError;
    use jit_cleaner_domain::PolicyBinding;

    use super::InMemoryPolicyStore;

    fn viewer(member: &str) -> PolicyBinding {
        PolicyBinding {
            role: "roles/viewer".to_owned(),
            members: vec![member.to_owned()],
            condition: None,
        }
    }

    #[tokio::test]
    async fn stale_etag_is_rejected() {
        let store = InMemoryPolicyStore::new();
        store
            .put_bindings("acme", vec![viewer("user:alice@example.com")])
            .await;

        let Ok(mut read) = store.get_policy("acme").await else {
            panic!("policy should be readable");
        };
        store
            .put_bindings("acme", vec![viewer("user:bob@example.com")])
            .await;
        read.bindings.clear();

        let written = store.set_policy("acme", &read).await;

        assert!(matches!(written, Err(AppError::Conflict(_))));
        assert_eq!(
            store.bindings("acme").await,
            vec![viewer("user:bob@example.com")]
        );
    }

    #[tokio::test]
    async fn fresh_etag_is_accepted_and_bumped() {
        let store = InMemoryPolicyStore::new();
        store
            .put_bindings("acme", vec![viewer("user:alice@example.com")])
            .await;

        let Ok(mut read) = store.get_policy("acme").await else {
            panic!("policy should be readable");
        };
        let etag = read.etag.clone();
        read.bindings.clear();

        let written = store.set_policy("acme", &read).await;

        assert!(written.is_ok_and(|policy| policy.etag != etag));
        assert!(store.bindings("acme").await.is_empty());
    }
}
