use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use jit_cleaner_core::{AppError, AppResult, NonEmptyString};
use serde::Deserialize;

use crate::timestamp::{GRANT_TIMESTAMP_FORMATS, parse_timestamp};

/// Window boundary assumed when a grant omits `start` or `end`.
///
/// Lies far in the past so such grants are always treated as expired.
pub const SENTINEL_TIMESTAMP: &str = "1900-01-01T00:00:00.00000Z";

const MEMBER_TYPE_PREFIXES: &[&str] = &[
    "user:",
    "serviceAccount:",
    "group:",
    "domain:",
    "principal:",
    "principalSet:",
];

/// Canonical IAM member reference such as `user:alice@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    /// Canonicalizes a user reference, prefixing bare emails with `user:`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(AppError::Payload("user must not be empty".to_owned()));
        }

        if MEMBER_TYPE_PREFIXES
            .iter()
            .any(|prefix| value.starts_with(prefix))
        {
            return Ok(Self(value));
        }

        Ok(Self(format!("user:{value}")))
    }

    /// Returns the member string as stored in policy bindings.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Principal {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Validity window of a grant.
///
/// Keeps the raw strings because the binding condition is rebuilt from them verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantWindow {
    start: String,
    end: String,
    end_at: DateTime<Utc>,
}

impl GrantWindow {
    /// Parses both boundaries with the accepted grant formats.
    pub fn parse(start: impl Into<String>, end: impl Into<String>) -> AppResult<Self> {
        let start = start.into();
        let end = end.into();
        parse_timestamp(start.as_str(), &GRANT_TIMESTAMP_FORMATS)?;
        let end_at = parse_timestamp(end.as_str(), &GRANT_TIMESTAMP_FORMATS)?;

        Ok(Self {
            start,
            end,
            end_at,
        })
    }

    /// Returns the raw start string.
    #[must_use]
    pub fn start(&self) -> &str {
        self.start.as_str()
    }

    /// Returns the raw end string.
    #[must_use]
    pub fn end(&self) -> &str {
        self.end.as_str()
    }

    /// Returns the parsed end instant.
    #[must_use]
    pub fn end_at(&self) -> DateTime<Utc> {
        self.end_at
    }
}

/// Typed grant decoded from a queued binding message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRecord {
    project_id: NonEmptyString,
    role: NonEmptyString,
    principal: Principal,
    window: GrantWindow,
}

#[derive(Debug, Deserialize)]
struct GrantEnvelope {
    payload: GrantPayload,
}

#[derive(Debug, Deserialize)]
struct GrantPayload {
    project_id: String,
    role: String,
    user: String,
    conditions: GrantConditions,
}

#[derive(Debug, Deserialize)]
struct GrantConditions {
    expression: GrantExpression,
}

#[derive(Debug, Deserialize)]
struct GrantExpression {
    start: Option<String>,
    end: Option<String>,
}

impl GrantRecord {
    /// Creates a grant record from already extracted fields.
    pub fn new(
        project_id: impl Into<String>,
        role: impl Into<String>,
        user: impl Into<String>,
        window: GrantWindow,
    ) -> AppResult<Self> {
        let project_id = NonEmptyString::new(project_id)
            .map_err(|_| AppError::Payload("project_id must not be empty".to_owned()))?;
        let role = NonEmptyString::new(role)
            .map_err(|_| AppError::Payload("role must not be empty".to_owned()))?;

        Ok(Self {
            project_id,
            role,
            principal: Principal::new(user)?,
            window,
        })
    }

    /// Decodes a raw message body into a grant record.
    pub fn decode(payload: &[u8]) -> AppResult<Self> {
        let envelope: GrantEnvelope = serde_json::from_slice(payload)
            .map_err(|error| AppError::Payload(format!("invalid grant payload: {error}")))?;
        let GrantPayload {
            project_id,
            role,
            user,
            conditions,
        } = envelope.payload;

        let window = GrantWindow::parse(
            conditions
                .expression
                .start
                .unwrap_or_else(|| SENTINEL_TIMESTAMP.to_owned()),
            conditions
                .expression
                .end
                .unwrap_or_else(|| SENTINEL_TIMESTAMP.to_owned()),
        )?;

        Self::new(project_id, role, user, window)
    }

    /// Returns the project owning the binding.
    #[must_use]
    pub fn project_id(&self) -> &str {
        self.project_id.as_str()
    }

    /// Returns the granted role.
    #[must_use]
    pub fn role(&self) -> &str {
        self.role.as_str()
    }

    /// Returns the canonical member that received the role.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the validity window.
    #[must_use]
    pub fn window(&self) -> &GrantWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use jit_cleaner_core::AppError;
    use serde_json::json;

    use super::{GrantRecord, Principal, SENTINEL_TIMESTAMP};

    fn payload(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap_or_default()
    }

    #[test]
    fn decodes_complete_grant() {
        let body = payload(json!({
            "payload": {
                "project_id": "acme-prod",
                "role": "roles/storage.admin",
                "user": "alice@example.com",
                "conditions": {
                    "expression": {
                        "start": "2024-01-01T00:00:00.000000Z",
                        "end": "2024-01-01T02:00:00Z"
                    }
                }
            }
        }));

        let grant = GrantRecord::decode(&body);
        let Ok(grant) = grant else {
            panic!("grant should decode: {grant:?}");
        };
        assert_eq!(grant.project_id(), "acme-prod");
        assert_eq!(grant.role(), "roles/storage.admin");
        assert_eq!(grant.principal().as_str(), "user:alice@example.com");
        assert_eq!(grant.window().end(), "2024-01-01T02:00:00Z");
        assert_eq!(
            Some(grant.window().end_at()),
            Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).single()
        );
    }

    #[test]
    fn missing_window_boundaries_default_to_sentinel() {
        let body = payload(json!({
            "payload": {
                "project_id": "acme-prod",
                "role": "roles/viewer",
                "user": "user:bob@example.com",
                "conditions": { "expression": {} }
            }
        }));

        let grant = GrantRecord::decode(&body);
        assert_eq!(
            grant
                .as_ref()
                .map(|grant| grant.window().start().to_owned())
                .ok()
                .as_deref(),
            Some(SENTINEL_TIMESTAMP)
        );
        assert_eq!(
            grant.map(|grant| grant.window().end_at()).ok(),
            Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).single()
        );
    }

    #[test]
    fn missing_required_field_is_payload_error() {
        let body = payload(json!({
            "payload": {
                "project_id": "acme-prod",
                "user": "alice@example.com",
                "conditions": { "expression": {} }
            }
        }));

        assert!(matches!(
            GrantRecord::decode(&body),
            Err(AppError::Payload(_))
        ));
    }

    #[test]
    fn non_json_body_is_payload_error() {
        assert!(matches!(
            GrantRecord::decode(b"not json"),
            Err(AppError::Payload(_))
        ));
    }

    #[test]
    fn blank_role_is_payload_error() {
        let body = payload(json!({
            "payload": {
                "project_id": "acme-prod",
                "role": "  ",
                "user": "alice@example.com",
                "conditions": { "expression": {} }
            }
        }));

        assert!(matches!(
            GrantRecord::decode(&body),
            Err(AppError::Payload(_))
        ));
    }

    #[test]
    fn unparseable_end_is_date_format_error() {
        let body = payload(json!({
            "payload": {
                "project_id": "acme-prod",
                "role": "roles/viewer",
                "user": "alice@example.com",
                "conditions": {
                    "expression": { "start": "2024-01-01T00:00:00Z", "end": "tomorrow" }
                }
            }
        }));

        assert!(matches!(
            GrantRecord::decode(&body),
            Err(AppError::DateFormat(_))
        ));
    }

    #[test]
    fn principal_keeps_existing_member_type() {
        let service_account = Principal::new("serviceAccount:ci@acme.iam.gserviceaccount.com");
        assert_eq!(
            service_account.map(|principal| principal.to_string()).ok().as_deref(),
            Some("serviceAccount:ci@acme.iam.gserviceaccount.com")
        );
        assert!(matches!(Principal::new(" "), Err(AppError::Payload(_))));
    }
}
