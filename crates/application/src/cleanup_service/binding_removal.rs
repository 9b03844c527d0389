use std::sync::Arc;

use jit_cleaner_core::AppResult;
use jit_cleaner_domain::{GrantRecord, Principal};
use tracing::{info, warn};

use crate::cleanup_ports::ResourcePolicyClient;

/// Removes expired JIT activation bindings from resource policies.
#[derive(Clone)]
pub struct PolicyBindingService {
    client: Arc<dyn ResourcePolicyClient>,
}

impl PolicyBindingService {
    /// Creates a binding removal service.
    #[must_use]
    pub fn new(client: Arc<dyn ResourcePolicyClient>) -> Self {
        Self { client }
    }

    /// Revokes the binding created for `grant`.
    pub async fn revoke_grant(&self, grant: &GrantRecord) -> AppResult<bool> {
        self.remove_member(
            grant.project_id(),
            grant.role(),
            grant.principal(),
            grant.window().start(),
            grant.window().end(),
        )
        .await
    }

    /// Removes `principal` from every binding on `resource` that matches the
    /// role and the JIT activation condition for `start`..`end`.
    ///
    /// Returns `false` without writing when nothing matched, so redelivered
    /// messages are harmless.
    pub async fn remove_member(
        &self,
        resource: &str,
        role: &str,
        principal: &Principal,
        start: &str,
        end: &str,
    ) -> AppResult<bool> {
        let mut policy = self.client.get_policy(resource).await?;

        if policy.bindings.is_empty() {
            info!(
                resource = %resource,
                role = %role,
                principal = %principal,
                "policy has no bindings; nothing to revoke"
            );
            return Ok(false);
        }

        let removed = policy.revoke_activation(role, principal, start, end);
        if removed == 0 {
            warn!(
                resource = %resource,
                role = %role,
                principal = %principal,
                start = %start,
                end = %end,
                "no JIT activation binding matched; treating as already revoked"
            );
            return Ok(false);
        }

        self.client.set_policy(resource, &policy).await?;

        info!(
            resource = %resource,
            role = %role,
            principal = %principal,
            removed_bindings = removed,
            "revoked expired JIT binding"
        );

        Ok(true)
    }
}
