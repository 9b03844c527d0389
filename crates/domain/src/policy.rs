//! Resource IAM policy model and JIT binding matching.
//!
//! Field names follow the Cloud IAM JSON representation so adapters can
//! exchange these types with the policy API unchanged.

use serde::{Deserialize, Serialize};

use crate::grant::Principal;

/// Title carried by every binding condition the JIT workflow creates.
pub const JIT_ACTIVATION_TITLE: &str = "JIT access activation";

/// Policy version that supports conditional role bindings.
pub const CONDITIONAL_POLICY_VERSION: i32 = 3;

/// Builds the condition expression for a grant window.
#[must_use]
pub fn activation_expression(start: &str, end: &str) -> String {
    format!("(request.time >= timestamp(\"{start}\") && request.time < timestamp(\"{end}\"))")
}

/// Condition restricting when a binding applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingCondition {
    /// CEL expression.
    pub expression: String,
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BindingCondition {
    /// Returns the condition the JIT workflow attaches for the given window.
    #[must_use]
    pub fn jit_activation(start: &str, end: &str) -> Self {
        Self {
            expression: activation_expression(start, end),
            title: JIT_ACTIVATION_TITLE.to_owned(),
            description: None,
        }
    }

    /// Compares expression and title; description is informational only.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.expression == other.expression && self.title == other.title
    }
}

/// One role binding inside a resource policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBinding {
    /// Granted role.
    pub role: String,
    /// Members holding the role.
    #[serde(default)]
    pub members: Vec<String>,
    /// Optional condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<BindingCondition>,
}

impl PolicyBinding {
    /// Returns whether this binding is the JIT activation for `role` and `principal`.
    #[must_use]
    pub fn is_activation_for(
        &self,
        role: &str,
        principal: &Principal,
        expected: &BindingCondition,
    ) -> bool {
        self.role == role
            && self.has_member(principal)
            && self
                .condition
                .as_ref()
                .is_some_and(|condition| condition.matches(expected))
    }

    /// Returns whether `principal` is a member of this binding.
    #[must_use]
    pub fn has_member(&self, principal: &Principal) -> bool {
        self.members
            .iter()
            .any(|member| member == principal.as_str())
    }
}

/// IAM policy attached to one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePolicy {
    /// Policy schema version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    /// Concurrency token returned by the policy API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Role bindings in API order.
    #[serde(default)]
    pub bindings: Vec<PolicyBinding>,
}

impl ResourcePolicy {
    /// Removes `principal` from every JIT activation binding matching the window.
    ///
    /// Returns the number of bindings the principal was removed from. When at
    /// least one removal happened, bindings left without members are dropped.
    pub fn revoke_activation(
        &mut self,
        role: &str,
        principal: &Principal,
        start: &str,
        end: &str,
    ) -> usize {
        let expected = BindingCondition::jit_activation(start, end);
        let mut removed = 0_usize;

        for binding in &mut self.bindings {
            if binding.is_activation_for(role, principal, &expected) {
                binding
                    .members
                    .retain(|member| member != principal.as_str());
                removed += 1;
            }
        }

        if removed > 0 {
            self.bindings.retain(|binding| !binding.members.is_empty());
            self.version = Some(CONDITIONAL_POLICY_VERSION);
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        BindingCondition, CONDITIONAL_POLICY_VERSION, JIT_ACTIVATION_TITLE, PolicyBinding,
        ResourcePolicy, activation_expression,
    };
    use crate::grant::Principal;

    const START: &str = "2000-01-01T00:00:00Z";
    const END: &str = "2000-01-01T01:00:00Z";

    fn principal(value: &str) -> Principal {
        match Principal::new(value) {
            Ok(principal) => principal,
            Err(error) => panic!("invalid principal fixture: {error}"),
        }
    }

    fn activation(role: &str, members: &[&str]) -> PolicyBinding {
        PolicyBinding {
            role: role.to_owned(),
            members: members.iter().map(|member| (*member).to_owned()).collect(),
            condition: Some(BindingCondition::jit_activation(START, END)),
        }
    }

    #[test]
    fn activation_expression_matches_grant_format() {
        assert_eq!(
            activation_expression(START, END),
            "(request.time >= timestamp(\"2000-01-01T00:00:00Z\") && request.time < timestamp(\"2000-01-01T01:00:00Z\"))"
        );
    }

    #[test]
    fn removing_last_member_drops_binding() {
        let mut policy = ResourcePolicy {
            version: Some(1),
            etag: Some("BwX1".to_owned()),
            bindings: vec![activation("roles/owner", &["user:alice@example.com"])],
        };

        let removed =
            policy.revoke_activation("roles/owner", &principal("alice@example.com"), START, END);

        assert_eq!(removed, 1);
        assert!(policy.bindings.is_empty());
        assert_eq!(policy.version, Some(CONDITIONAL_POLICY_VERSION));
        assert_eq!(policy.etag.as_deref(), Some("BwX1"));
    }

    #[test]
    fn other_members_stay_bound() {
        let mut policy = ResourcePolicy {
            bindings: vec![activation(
                "roles/editor",
                &["user:alice@example.com", "user:bob@example.com"],
            )],
            ..ResourcePolicy::default()
        };

        policy.revoke_activation("roles/editor", &principal("alice@example.com"), START, END);

        assert_eq!(policy.bindings.len(), 1);
        assert_eq!(policy.bindings[0].members, vec!["user:bob@example.com"]);
    }

    #[test]
    fn title_mismatch_leaves_policy_unchanged() {
        let mut binding = activation("roles/owner", &["user:alice@example.com"]);
        if let Some(condition) = binding.condition.as_mut() {
            condition.title = "other".to_owned();
        }
        let mut policy = ResourcePolicy {
            bindings: vec![binding],
            ..ResourcePolicy::default()
        };
        let before = policy.clone();

        let removed =
            policy.revoke_activation("roles/owner", &principal("alice@example.com"), START, END);

        assert_eq!(removed, 0);
        assert_eq!(policy, before);
    }

    #[test]
    fn unconditional_and_other_window_bindings_are_ignored() {
        let mut policy = ResourcePolicy {
            bindings: vec![
                PolicyBinding {
                    role: "roles/owner".to_owned(),
                    members: vec!["user:alice@example.com".to_owned()],
                    condition: None,
                },
                PolicyBinding {
                    role: "roles/owner".to_owned(),
                    members: vec!["user:alice@example.com".to_owned()],
                    condition: Some(BindingCondition::jit_activation(
                        START,
                        "2000-01-02T00:00:00Z",
                    )),
                },
                activation("roles/owner", &["user:alice@example.com"]),
            ],
            ..ResourcePolicy::default()
        };

        let removed =
            policy.revoke_activation("roles/owner", &principal("alice@example.com"), START, END);

        assert_eq!(removed, 1);
        assert_eq!(policy.bindings.len(), 2);
        assert!(policy.bindings.iter().all(|binding| {
            binding.condition.as_ref().is_none_or(|condition| {
                condition.expression != activation_expression(START, END)
            })
        }));
    }

    #[test]
    fn duplicate_matching_bindings_are_all_revoked() {
        let mut policy = ResourcePolicy {
            bindings: vec![
                activation("roles/owner", &["user:alice@example.com"]),
                activation("roles/owner", &["user:alice@example.com", "group:ops@example.com"]),
            ],
            ..ResourcePolicy::default()
        };

        let removed =
            policy.revoke_activation("roles/owner", &principal("alice@example.com"), START, END);

        assert_eq!(removed, 2);
        assert_eq!(policy.bindings.len(), 1);
        assert_eq!(policy.bindings[0].members, vec!["group:ops@example.com"]);
    }

    #[test]
    fn deserializes_iam_policy_json() {
        let policy = serde_json::from_value::<ResourcePolicy>(json!({
            "version": 3,
            "etag": "BwYAAA==",
            "bindings": [{
                "role": "roles/viewer",
                "members": ["user:alice@example.com"],
                "condition": {
                    "expression": activation_expression(START, END),
                    "title": JIT_ACTIVATION_TITLE
                }
            }]
        }));

        let Ok(policy) = policy else {
            panic!("policy should deserialize");
        };
        assert_eq!(policy.etag.as_deref(), Some("BwYAAA=="));
        assert_eq!(
            policy.bindings[0].condition,
            Some(BindingCondition::jit_activation(START, END))
        );
    }
}
