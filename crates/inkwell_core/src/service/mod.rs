//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce ownership and role checks before any mutation.
//! - Keep the HTTP layer decoupled from storage details.
//!
//! # Invariants
//! - Services borrow one `Connection`; repositories are built per call.
//! - Every service error maps onto exactly one HTTP status class.

use crate::model::user::User;
use crate::model::ValidationError;
use crate::repo::RepoError;
use crate::search::fts::SearchError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod admin_service;
pub mod analytics_service;
pub mod article_service;
pub mod auth_service;
pub mod bookmark_service;
pub mod clap_service;
pub mod comment_service;
pub mod content_filter;
pub mod dashboard_service;
pub mod feed_service;
pub mod follow_service;
pub mod moderation_service;
pub mod notification_service;
pub mod publication_service;
pub mod security_monitor;
pub mod seo_service;
pub mod upload_service;
pub mod user_service;
pub mod workflow_service;

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Use-case error shared by every service.
#[derive(Debug)]
pub enum ServiceError {
    /// Caller input failed validation.
    InvalidInput(String),
    /// Missing, unknown or expired credentials.
    Unauthorized(String),
    /// Authenticated but not allowed.
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Repo(RepoError),
    Search(SearchError),
    Io(std::io::Error),
    /// Failure outside storage, such as password hashing.
    Internal(String),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(entity: &str, id: impl Display) -> Self {
        Self::NotFound(format!("{entity} not found: {id}"))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Unauthorized(message) => write!(f, "unauthorized: {message}"),
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::NotFound(message) => write!(f, "{message}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Search(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Search(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidInput(err.to_string()),
            RepoError::NotFound { entity, id } => Self::not_found(entity, id),
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

impl From<SearchError> for ServiceError {
    fn from(value: SearchError) -> Self {
        match value {
            SearchError::InvalidQuery { message, .. } => {
                Self::InvalidInput(format!("invalid search query: {message}"))
            }
            other => Self::Search(other),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub(crate) fn require_admin(actor: &User) -> ServiceResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("admin role required"))
    }
}

pub(crate) fn require_moderator(actor: &User) -> ServiceResult<()> {
    if actor.can_moderate() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("moderator role required"))
    }
}

/// Runs `op` inside one transaction; any error rolls every write back.
///
/// Nothing called from `op` may open its own transaction.
pub(crate) fn in_transaction<T>(
    conn: &Connection,
    op: impl FnOnce() -> ServiceResult<T>,
) -> ServiceResult<T> {
    let tx = conn.unchecked_transaction().map_err(RepoError::from)?;
    let value = op()?;
    tx.commit().map_err(RepoError::from)?;
    Ok(value)
}

/// Validates a look-back window in days; `None` selects `default`.
pub(crate) fn window_days(days: Option<u32>, default: u32, max: u32) -> ServiceResult<u32> {
    let days = days.unwrap_or(default);
    if days == 0 || days > max {
        return Err(ServiceError::invalid(format!(
            "days must be between 1 and {max}"
        )));
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::{in_transaction, window_days, ServiceError};
    use crate::db::open_db_in_memory;
    use crate::repo::RepoError;
    use rusqlite::Connection;

    fn event_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM security_events;", [], |row| row.get(0))
            .unwrap()
    }

    fn insert_event(conn: &Connection) {
        conn.execute("INSERT INTO security_events (event_type) VALUES ('login');", [])
            .unwrap();
    }

    #[test]
    fn in_transaction_commits_on_success() {
        let conn = open_db_in_memory().unwrap();
        let value = in_transaction(&conn, || {
            insert_event(&conn);
            insert_event(&conn);
            Ok(2)
        })
        .unwrap();
        assert_eq!(value, 2);
        assert_eq!(event_count(&conn), 2);
    }

    #[test]
    fn in_transaction_rolls_back_earlier_writes_on_error() {
        let conn = open_db_in_memory().unwrap();
        let result: Result<(), ServiceError> = in_transaction(&conn, || {
            insert_event(&conn);
            Err(ServiceError::invalid("second step failed"))
        });
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
        assert_eq!(event_count(&conn), 0);
    }

    #[test]
    fn repo_errors_map_to_semantic_variants() {
        let err: ServiceError = RepoError::not_found("article", 7).into();
        assert!(matches!(err, ServiceError::NotFound(ref message) if message.contains("7")));
        let err: ServiceError = RepoError::Conflict("taken".to_string()).into();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn window_days_bounds() {
        assert_eq!(window_days(None, 7, 365).unwrap(), 7);
        assert!(window_days(Some(0), 7, 365).is_err());
        assert!(window_days(Some(366), 7, 365).is_err());
    }
}
