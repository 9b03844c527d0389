//! Domain types and pure decisions for JIT grant cleanup.

#![forbid(unsafe_code)]

mod expiry;
mod grant;
mod origin;
mod policy;
mod timestamp;

pub use expiry::{ExpiryDecision, STALE_REQUEUE_AFTER_DAYS, evaluate_expiry};
pub use grant::{GrantRecord, GrantWindow, Principal, SENTINEL_TIMESTAMP};
pub use origin::{MessageOrigin, ORIGIN_ATTRIBUTE};
pub use policy::{
    BindingCondition, CONDITIONAL_POLICY_VERSION, JIT_ACTIVATION_TITLE, PolicyBinding,
    ResourcePolicy, activation_expression,
};
pub use timestamp::{GRANT_TIMESTAMP_FORMATS, TimestampFormat, parse_timestamp};
