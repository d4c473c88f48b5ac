//! Reader engagement records: comments, claps, bookmarks, follows, reads.
//!
//! # Invariants
//! - A user holds at most `MAX_CLAPS_PER_USER` claps on one article.
//! - A reply's parent comment belongs to the same article.
//! - A user never follows themselves.

use super::article::ArticleId;
use super::user::UserId;
use super::{require_text, ValidationError};
use serde::{Deserialize, Serialize};

pub type CommentId = i64;

pub const MAX_CLAPS_PER_USER: i64 = 50;
pub const COMMENT_MAX_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub user_id: UserId,
    pub username: String,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

pub fn validate_comment(content: &str) -> Result<(), ValidationError> {
    require_text("content", content, 1, COMMENT_MAX_CHARS)
}

/// Clap totals after one clap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClapOutcome {
    /// Claps actually added by this request after capping.
    pub added: i64,
    pub user_total: i64,
    pub article_total: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClapSummary {
    pub total_claps: i64,
    pub clappers: i64,
}

/// Validates one clap request amount.
pub fn validate_clap_count(count: i64) -> Result<(), ValidationError> {
    if (1..=MAX_CLAPS_PER_USER).contains(&count) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "count",
            format!("must be between 1 and {MAX_CLAPS_PER_USER}"),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowStatus {
    pub following: bool,
    pub followers: i64,
}

/// Reader progress report for one article visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReadProgress {
    pub read_percentage: i64,
    #[serde(default)]
    pub time_spent_seconds: i64,
}

impl ReadProgress {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0..=100).contains(&self.read_percentage) {
            return Err(ValidationError::new(
                "read_percentage",
                "must be between 0 and 100",
            ));
        }
        if self.time_spent_seconds < 0 {
            return Err(ValidationError::new(
                "time_spent_seconds",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_clap_count, ReadProgress};

    #[test]
    fn clap_count_bounds() {
        assert!(validate_clap_count(0).is_err());
        assert!(validate_clap_count(1).is_ok());
        assert!(validate_clap_count(50).is_ok());
        assert!(validate_clap_count(51).is_err());
    }

    #[test]
    fn read_progress_bounds() {
        let ok = ReadProgress {
            read_percentage: 100,
            time_spent_seconds: 30,
        };
        assert!(ok.validate().is_ok());
        let bad = ReadProgress {
            read_percentage: 101,
            time_spent_seconds: 0,
        };
        assert!(bad.validate().is_err());
    }
}
