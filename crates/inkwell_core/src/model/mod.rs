//! Domain model for the publishing platform.
//!
//! # Responsibility
//! - Define canonical data structures used by repositories and services.
//! - Own field-level validation rules shared by every write path.
//!
//! # Invariants
//! - Every entity is identified by an auto-increment `i64` key.
//! - Enum-valued columns round-trip through `as_str`/`parse` only.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod analytics;
pub mod article;
pub mod engagement;
pub mod moderation;
pub mod notification;
pub mod publication;
pub mod security;
pub mod upload;
pub mod user;

/// Field-level validation failure raised before any SQL mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Error for ValidationError {}

/// One `GROUP BY` bucket: a label and its row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Checks that a required text field is non-blank and within `max_chars`.
pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    min_chars: usize,
    max_chars: usize,
) -> Result<(), ValidationError> {
    let count = value.trim().chars().count();
    if count < min_chars.max(1) {
        return Err(ValidationError::new(
            field,
            if min_chars <= 1 {
                "must not be blank".to_string()
            } else {
                format!("must be at least {min_chars} characters")
            },
        ));
    }
    if count > max_chars {
        return Err(ValidationError::new(
            field,
            format!("must be at most {max_chars} characters"),
        ));
    }
    Ok(())
}

/// Checks an optional text field against `max_chars`.
pub(crate) fn limit_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(text) if text.chars().count() > max_chars => Err(ValidationError::new(
            field,
            format!("must be at most {max_chars} characters"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{limit_text, require_text};

    #[test]
    fn require_text_rejects_blank_and_overlong_values() {
        assert!(require_text("title", "   ", 1, 10).is_err());
        assert!(require_text("title", "abcdefghijk", 1, 10).is_err());
        assert!(require_text("title", "ok", 1, 10).is_ok());
        let err = require_text("username", "ab", 3, 30).unwrap_err();
        assert!(err.message.contains("at least 3"));
    }

    #[test]
    fn limit_text_allows_missing_values() {
        assert!(limit_text("bio", None, 5).is_ok());
        assert!(limit_text("bio", Some("toolong"), 5).is_err());
    }
}
