//! Registration, login and bearer-session use-cases.
//!
//! # Invariants
//! - Passwords are only ever stored as bcrypt hashes.
//! - Every login attempt writes one security event.
//! - Sessions are UUID v4 tokens valid for `SESSION_TTL_MS`.

use super::security_monitor::SecurityMonitor;
use super::{ServiceError, ServiceResult};
use crate::db::now_epoch_ms;
use crate::logging::single_line;
use crate::model::security::{event_types, NewSecurityEvent, Severity};
use crate::model::user::{validate_password, NewUser, User, UserId, UserRole};
use crate::repo::session_repo::{SessionRepository, SqliteSessionRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const BCRYPT_COST: u32 = 10;
pub const SESSION_TTL_MS: i64 = 7 * super::DAY_MS;
const LOGIN_DETAIL_CHARS: usize = 64;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    /// Email address or username.
    #[serde(alias = "email", alias = "username")]
    pub login: String,
    pub password: String,
}

/// Issued bearer session.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: i64,
    pub user: User,
}

pub struct AuthService<'conn> {
    conn: &'conn Connection,
    bcrypt_cost: u32,
}

impl<'conn> AuthService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            bcrypt_cost: BCRYPT_COST,
        }
    }

    /// Overrides the hashing cost; tests use the minimum cost of 4.
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn register(&self, input: &RegisterInput, ip: Option<&str>) -> ServiceResult<AuthSession> {
        validate_password(&input.password)?;
        let users = SqliteUserRepository::new(self.conn);
        let password_hash = self.hash_password(&input.password)?;
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let user = users.create_user(&NewUser {
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            password_hash,
            name,
            role: UserRole::User,
        })?;

        SecurityMonitor::new(self.conn).log_event(
            &NewSecurityEvent::new(event_types::REGISTER, Severity::Info)
                .user(user.id)
                .ip(ip),
        )?;
        info!(
            "event=user_register module=auth status=ok user_id={}",
            user.id
        );
        self.issue_session(user, ip)
    }

    pub fn login(&self, input: &LoginInput, ip: Option<&str>) -> ServiceResult<AuthSession> {
        let users = SqliteUserRepository::new(self.conn);
        let monitor = SecurityMonitor::new(self.conn);

        let verified = match users.find_credentials(&input.login)? {
            Some((user, hash)) if self.verify_password(&input.password, &hash)? => Some(user),
            _ => None,
        };
        let Some(user) = verified else {
            monitor.log_event(
                &NewSecurityEvent::new(event_types::FAILED_LOGIN, Severity::Warning)
                    .ip(ip)
                    .details(format!("login={}", single_line(input.login.trim(), LOGIN_DETAIL_CHARS))),
            )?;
            warn!("event=user_login module=auth status=rejected reason=bad_credentials");
            return Err(ServiceError::Unauthorized(
                "invalid credentials".to_string(),
            ));
        };

        if user.is_suspended {
            monitor.log_event(
                &NewSecurityEvent::new(event_types::SUSPENDED_LOGIN, Severity::Warning)
                    .user(user.id)
                    .ip(ip),
            )?;
            warn!(
                "event=user_login module=auth status=rejected reason=suspended user_id={}",
                user.id
            );
            return Err(ServiceError::forbidden("account is suspended"));
        }

        monitor.log_event(
            &NewSecurityEvent::new(event_types::LOGIN, Severity::Info)
                .user(user.id)
                .ip(ip),
        )?;
        let purged = self.purge_expired_sessions()?;
        info!(
            "event=user_login module=auth status=ok user_id={} purged_sessions={purged}",
            user.id
        );
        self.issue_session(user, ip)
    }

    pub fn logout(&self, token: &str) -> ServiceResult<()> {
        let sessions = SqliteSessionRepository::new(self.conn);
        if !sessions.delete_session(token)? {
            return Err(ServiceError::Unauthorized("unknown session".to_string()));
        }
        Ok(())
    }

    /// Resolves a bearer token to its active, non-suspended owner.
    pub fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let sessions = SqliteSessionRepository::new(self.conn);
        let user = sessions
            .find_session_user(token, now_epoch_ms())?
            .ok_or_else(|| ServiceError::Unauthorized("invalid or expired session".to_string()))?;
        if user.is_suspended {
            return Err(ServiceError::forbidden("account is suspended"));
        }
        Ok(user)
    }

    /// Replaces the password and revokes every other session of the user.
    pub fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
        keep_token: Option<&str>,
    ) -> ServiceResult<()> {
        validate_password(new_password)?;
        let users = SqliteUserRepository::new(self.conn);
        let stored_hash = users.password_hash(user_id)?;
        if !self.verify_password(current_password, &stored_hash)? {
            return Err(ServiceError::Unauthorized(
                "current password is incorrect".to_string(),
            ));
        }

        let new_hash = self.hash_password(new_password)?;
        users.set_password_hash(user_id, &new_hash)?;
        let revoked = SqliteSessionRepository::new(self.conn)
            .delete_user_sessions(user_id, keep_token)?;

        SecurityMonitor::new(self.conn).log_event(
            &NewSecurityEvent::new(event_types::PASSWORD_CHANGED, Severity::Info).user(user_id),
        )?;
        info!(
            "event=password_change module=auth status=ok user_id={} revoked_sessions={}",
            user_id, revoked
        );
        Ok(())
    }

    pub fn me(&self, user_id: UserId) -> ServiceResult<User> {
        SqliteUserRepository::new(self.conn)
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::not_found("user", user_id))
    }

    /// Removes sessions past their expiry; returns how many were deleted.
    pub fn purge_expired_sessions(&self) -> ServiceResult<usize> {
        Ok(SqliteSessionRepository::new(self.conn).purge_expired(now_epoch_ms())?)
    }

    fn issue_session(&self, user: User, ip: Option<&str>) -> ServiceResult<AuthSession> {
        let token = Uuid::new_v4().to_string();
        let expires_at = now_epoch_ms() + SESSION_TTL_MS;
        SqliteSessionRepository::new(self.conn).create_session(&token, user.id, ip, expires_at)?;
        Ok(AuthSession {
            token,
            expires_at,
            user,
        })
    }

    fn hash_password(&self, password: &str) -> ServiceResult<String> {
        bcrypt::hash(password, self.bcrypt_cost)
            .map_err(|err| ServiceError::Internal(format!("password hashing failed: {err}")))
    }

    fn verify_password(&self, password: &str, hash: &str) -> ServiceResult<bool> {
        bcrypt::verify(password, hash)
            .map_err(|err| ServiceError::Internal(format!("password verification failed: {err}")))
    }
}
