use chrono::{DateTime, Duration, Utc};

/// Age after which a pending message is republished instead of left for redelivery.
pub const STALE_REQUEUE_AFTER_DAYS: i64 = 6;

/// Outcome of evaluating a grant against the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryDecision {
    /// The grant window has closed; revoke the binding.
    Expired,
    /// The grant is still active but the message is old enough to recirculate.
    StaleRequeue,
    /// The grant is still active; leave the message unacknowledged.
    Pending,
}

impl ExpiryDecision {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::StaleRequeue => "stale_requeue",
            Self::Pending => "pending",
        }
    }
}

/// Decides what to do with a grant ending at `end`, published at `publish_time`.
///
/// Expiry is checked before staleness.
#[must_use]
pub fn evaluate_expiry(
    end: DateTime<Utc>,
    publish_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ExpiryDecision {
    if end < now {
        return ExpiryDecision::Expired;
    }

    let stale_at = publish_time
        .checked_add_signed(Duration::days(STALE_REQUEUE_AFTER_DAYS))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    if stale_at < now {
        return ExpiryDecision::StaleRequeue;
    }

    ExpiryDecision::Pending
}
