use chrono::{DateTime, Utc};
use jit_cleaner_core::AppResult;
use jit_cleaner_domain::{
    ExpiryDecision, GrantRecord, MessageOrigin, ORIGIN_ATTRIBUTE, evaluate_expiry,
};
use tracing::{debug, info, warn};

use crate::cleanup_ports::QueueMessage;

use super::{PolicyBindingService, Republisher};

/// Terminal result of routing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Origin missing, unrecognized, or owned by another stage.
    Ignored,
    /// Payload could not be decoded and was moved to the error origin.
    Quarantined,
    /// Grant expired and its binding was removed.
    Revoked,
    /// Grant expired but no matching binding was left.
    AlreadyRevoked,
    /// Grant still active; message recirculated as a fresh binding message.
    Requeued,
    /// Grant still active; message left for redelivery.
    Pending,
}

impl RouteOutcome {
    /// Returns whether the message should be acknowledged.
    #[must_use]
    pub fn should_ack(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Quarantined => "quarantined",
            Self::Revoked => "revoked",
            Self::AlreadyRevoked => "already_revoked",
            Self::Requeued => "requeued",
            Self::Pending => "pending",
        }
    }
}

/// Classifies inbound messages and applies the expiry policy to binding messages.
#[derive(Clone)]
pub struct MessageRouter {
    binding_service: PolicyBindingService,
    republisher: Republisher,
}

impl MessageRouter {
    /// Creates a router.
    #[must_use]
    pub fn new(binding_service: PolicyBindingService, republisher: Republisher) -> Self {
        Self {
            binding_service,
            republisher,
        }
    }

    /// Routes one message evaluated at `now`.
    ///
    /// Policy and publish failures are returned to the caller, which decides
    /// between quarantine and redelivery.
    pub async fn route(
        &self,
        message: &QueueMessage,
        now: DateTime<Utc>,
    ) -> AppResult<RouteOutcome> {
        let Some(origin) = message.origin() else {
            warn!(
                message_id = %message.message_id,
                "message has no origin attribute; check the subscription filter"
            );
            return Ok(RouteOutcome::Ignored);
        };

        if origin == MessageOrigin::NotImplemented {
            warn!(
                message_id = %message.message_id,
                origin = ?message.attributes.get(ORIGIN_ATTRIBUTE),
                "message origin is not recognized; check the subscription filter"
            );
            return Ok(RouteOutcome::Ignored);
        }

        if !origin.is_revocation_candidate() {
            debug!(
                message_id = %message.message_id,
                origin = %origin,
                "message belongs to another stage"
            );
            return Ok(RouteOutcome::Ignored);
        }

        let grant = match GrantRecord::decode(&message.data) {
            Ok(grant) => grant,
            Err(error) => {
                warn!(
                    message_id = %message.message_id,
                    error = %error,
                    "failed to decode grant payload; quarantining"
                );
                self.republisher.quarantine(&message.data).await?;
                return Ok(RouteOutcome::Quarantined);
            }
        };

        let decision = evaluate_expiry(grant.window().end_at(), message.publish_time, now);
        debug!(
            message_id = %message.message_id,
            resource = %grant.project_id(),
            role = %grant.role(),
            principal = %grant.principal(),
            end = %grant.window().end(),
            decision = decision.as_str(),
            "evaluated grant expiry"
        );

        match decision {
            ExpiryDecision::Expired => {
                let removed = self.binding_service.revoke_grant(&grant).await?;
                Ok(if removed {
                    RouteOutcome::Revoked
                } else {
                    RouteOutcome::AlreadyRevoked
                })
            }
            ExpiryDecision::StaleRequeue => {
                info!(
                    message_id = %message.message_id,
                    publish_time = %message.publish_time,
                    "grant still active on a stale message; requeueing"
                );
                self.republisher
                    .republish(&message.data, MessageOrigin::Binding)
                    .await?;
                Ok(RouteOutcome::Requeued)
            }
            ExpiryDecision::Pending => Ok(RouteOutcome::Pending),
        }
    }
}
