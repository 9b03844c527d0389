//! Shared primitives for all Rust crates in the JIT access cleaner.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across cleaner crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Error categories raised while draining and processing grant messages.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Message payload is malformed or misses a required field.
    #[error("payload error: {0}")]
    Payload(String),

    /// Timestamp does not match any accepted format.
    #[error("date format error: {0}")]
    DateFormat(String),

    /// Reading or writing a resource policy failed.
    #[error("policy access error: {0}")]
    PolicyAccess(String),

    /// Access token could not be acquired.
    #[error("credential error: {0}")]
    Credential(String),

    /// Policy write was rejected because the policy changed since it was read.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Queue pull, acknowledge or publish call failed.
    #[error("queue error: {0}")]
    Queue(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
