use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, Utc};
use jit_cleaner_core::{AppError, AppResult};

/// One accepted serialization of a `Z`-suffixed UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampFormat {
    pattern: &'static str,
    fractional: bool,
}

impl TimestampFormat {
    /// `YYYY-MM-DDTHH:MM:SS.ffffffZ`, requires a fractional component.
    pub const FRACTIONAL: Self = Self {
        pattern: "%Y-%m-%dT%H:%M:%S%.fZ",
        fractional: true,
    };

    /// `YYYY-MM-DDTHH:MM:SSZ`, any fractional component is discarded first.
    pub const SECONDS: Self = Self {
        pattern: "%Y-%m-%dT%H:%M:%SZ",
        fractional: false,
    };
}

/// Formats accepted for grant validity windows, highest precision first.
pub const GRANT_TIMESTAMP_FORMATS: [TimestampFormat; 2] =
    [TimestampFormat::FRACTIONAL, TimestampFormat::SECONDS];

/// Parses `value` with the first matching format in `formats`.
pub fn parse_timestamp(value: &str, formats: &[TimestampFormat]) -> AppResult<DateTime<Utc>> {
    let value = value.trim();

    for format in formats {
        let candidate = if format.fractional {
            if !has_fraction(value) {
                continue;
            }
            Cow::Borrowed(value)
        } else {
            strip_fraction(value)
        };

        if let Ok(parsed) = NaiveDateTime::parse_from_str(candidate.as_ref(), format.pattern) {
            return Ok(parsed.and_utc());
        }
    }

    Err(AppError::DateFormat(format!(
        "timestamp '{value}' matches none of the accepted formats"
    )))
}

fn has_fraction(value: &str) -> bool {
    value
        .find('.')
        .and_then(|dot| value[dot + 1..].chars().next())
        .is_some_and(|next| next.is_ascii_digit())
}

fn strip_fraction(value: &str) -> Cow<'_, str> {
    let Some(dot) = value.find('.') else {
        return Cow::Borrowed(value);
    };

    let digits_end = value[dot + 1..]
        .find(|character: char| !character.is_ascii_digit())
        .map_or(value.len(), |offset| dot + 1 + offset);

    Cow::Owned(format!("{}{}", &value[..dot], &value[digits_end..]))
}
