//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts, one trait per aggregate.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate model input before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

use crate::db::DbError;
use crate::model::ValidationError;
use rusqlite::types::Value;
use rusqlite::ErrorCode;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod analytics_repo;
pub mod article_repo;
pub mod comment_repo;
pub mod engagement_repo;
pub mod follow_repo;
pub mod health_repo;
pub mod moderation_repo;
pub mod notification_repo;
pub mod publication_repo;
pub mod security_repo;
pub mod seo_repo;
pub mod session_repo;
pub mod submission_repo;
pub mod upload_repo;
pub mod user_repo;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 50;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: i64 },
    Conflict(String),
    InvalidData(String),
}

impl RepoError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::Conflict(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Limit/offset pagination shared by list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Effective limit after defaulting and clamping.
    pub fn applied_limit(&self) -> u32 {
        normalize_limit(self.limit)
    }

    /// Appends `LIMIT ? OFFSET ?` with bound values.
    pub(crate) fn push_sql(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(self.applied_limit())));
        if self.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }
    }
}

/// Normalizes a list limit: defaults to 10 and clamps to 50.
pub fn normalize_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => DEFAULT_PAGE_LIMIT,
        Some(value) if value > MAX_PAGE_LIMIT => MAX_PAGE_LIMIT,
        Some(value) => value,
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

/// Parses an enum-valued TEXT column, rejecting unknown values.
pub(crate) fn parse_column<T>(
    value: &str,
    column: &str,
    parse: fn(&str) -> Option<T>,
) -> RepoResult<T> {
    parse(value).ok_or_else(|| RepoError::InvalidData(format!("invalid value `{value}` in {column}")))
}

/// Maps UNIQUE/CHECK constraint failures to `Conflict`.
pub(crate) fn map_constraint(err: rusqlite::Error, message: impl Into<String>) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            RepoError::Conflict(message.into())
        }
        _ => RepoError::from(err),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_limit, Page};
    use rusqlite::types::Value;

    #[test]
    fn limit_defaults_to_10_and_caps_at_50() {
        assert_eq!(normalize_limit(None), 10);
        assert_eq!(normalize_limit(Some(0)), 10);
        assert_eq!(normalize_limit(Some(25)), 25);
        assert_eq!(normalize_limit(Some(500)), 50);
    }

    #[test]
    fn page_sql_omits_zero_offset() {
        let mut sql = String::new();
        let mut binds: Vec<Value> = Vec::new();
        Page::new(5, 0).push_sql(&mut sql, &mut binds);
        assert_eq!(sql, " LIMIT ?");
        assert_eq!(binds.len(), 1);

        let mut sql = String::new();
        let mut binds: Vec<Value> = Vec::new();
        Page::new(5, 10).push_sql(&mut sql, &mut binds);
        assert_eq!(sql, " LIMIT ? OFFSET ?");
        assert_eq!(binds.len(), 2);
    }
}
