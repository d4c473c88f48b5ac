//! Bearer-token session storage.
//!
//! # Invariants
//! - A session resolves to a user only while `expires_at > now`.
//! - Deleting a user cascades to its sessions.

use super::user_repo::{parse_user_row, USER_COLUMNS_U};
use super::RepoResult;
use crate::model::user::{User, UserId};
use rusqlite::{params, Connection};

pub trait SessionRepository {
    fn create_session(
        &self,
        token: &str,
        user_id: UserId,
        ip_address: Option<&str>,
        expires_at: i64,
    ) -> RepoResult<()>;
    /// Returns the session owner when the token exists and has not expired.
    fn find_session_user(&self, token: &str, now: i64) -> RepoResult<Option<User>>;
    fn delete_session(&self, token: &str) -> RepoResult<bool>;
    /// Deletes every session of `user_id`, optionally keeping one token.
    fn delete_user_sessions(&self, user_id: UserId, keep_token: Option<&str>) -> RepoResult<usize>;
    fn purge_expired(&self, now: i64) -> RepoResult<usize>;
}

pub struct SqliteSessionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSessionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn create_session(
        &self,
        token: &str,
        user_id: UserId,
        ip_address: Option<&str>,
        expires_at: i64,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO auth_sessions (token, user_id, ip_address, expires_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![token, user_id, ip_address, expires_at],
        )?;
        Ok(())
    }

    fn find_session_user(&self, token: &str, now: i64) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS_U}
             FROM auth_sessions s
             INNER JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1
               AND s.expires_at > ?2;"
        ))?;
        let mut rows = stmt.query(params![token, now])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn delete_session(&self, token: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM auth_sessions WHERE token = ?1;", [token])?;
        Ok(changed > 0)
    }

    fn delete_user_sessions(&self, user_id: UserId, keep_token: Option<&str>) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM auth_sessions
             WHERE user_id = ?1
               AND (?2 IS NULL OR token <> ?2);",
            params![user_id, keep_token],
        )?;
        Ok(changed)
    }

    fn purge_expired(&self, now: i64) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM auth_sessions WHERE expires_at <= ?1;", [now])?;
        Ok(changed)
    }
}
