use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Attribute key carrying the origin tag on every queued message.
pub const ORIGIN_ATTRIBUTE: &str = "origin";

/// Pipeline stage a queued message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageOrigin {
    /// Active binding awaiting expiry and revocation.
    Binding,
    /// Approval event emitted by the grant workflow.
    Approval,
    /// Message quarantined after a processing failure.
    Error,
    /// Notification event for requesters and approvers.
    Notification,
    /// Synthetic message used for smoke tests.
    Test,
    /// Any tag this pipeline does not recognize.
    NotImplemented,
}

impl MessageOrigin {
    /// Returns the stable attribute value for this origin.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binding => "jit-binding",
            Self::Approval => "jit-approval",
            Self::Error => "jit-error",
            Self::Notification => "jit-notification",
            Self::Test => "jit-test",
            Self::NotImplemented => "not-implemented",
        }
    }

    /// Parses an attribute value, falling back to [`MessageOrigin::NotImplemented`].
    #[must_use]
    pub fn from_attribute(value: &str) -> Self {
        match value {
            "jit-binding" => Self::Binding,
            "jit-approval" => Self::Approval,
            "jit-error" => Self::Error,
            "jit-notification" => Self::Notification,
            "jit-test" => Self::Test,
            _ => Self::NotImplemented,
        }
    }

    /// Returns whether the cleaner evaluates messages with this origin.
    #[must_use]
    pub fn is_revocation_candidate(&self) -> bool {
        matches!(self, Self::Binding)
    }
}

impl Display for MessageOrigin {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
