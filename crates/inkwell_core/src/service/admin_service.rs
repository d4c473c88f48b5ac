//! Site administration: user management and system health.
//!
//! # Invariants
//! - Admin role required for every operation.
//! - An admin never suspends, deletes or demotes themself.
//! - The last admin is never deleted or demoted.
//! - Every user mutation is audit-logged.

use super::security_monitor::SecurityMonitor;
use super::{require_admin, ServiceError, ServiceResult};
use crate::db::now_epoch_ms;
use crate::logging::logging_status;
use crate::model::security::{HealthMetric, NewAuditLog};
use crate::model::user::{User, UserId, UserRole};
use crate::model::LabelCount;
use crate::repo::health_repo::{HealthRepository, SqliteHealthRepository};
use crate::repo::security_repo::{SecurityRepository, SqliteSecurityRepository};
use crate::repo::session_repo::{SessionRepository, SqliteSessionRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserListQuery, UserRepository};
use crate::repo::Page;
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const METRIC_DB_SIZE: &str = "database_size_bytes";
pub const METRIC_DB_INTEGRITY: &str = "database_integrity_ok";
pub const METRIC_UPLOAD_WRITABLE: &str = "upload_dir_writable";
pub const METRIC_USER_COUNT: &str = "user_count";
pub const METRIC_ARTICLE_COUNT: &str = "article_count";

/// Point-in-time health report.
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub status: &'static str,
    pub database_reachable: bool,
    pub integrity: Vec<String>,
    pub database_size_bytes: i64,
    pub table_counts: Vec<LabelCount>,
    pub upload_dir_writable: bool,
    /// Running logger as `level@target`; `None` before init.
    pub logging: Option<String>,
    pub checked_at: i64,
}

pub struct AdminService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> AdminService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn list_users(&self, actor: &User, query: &UserListQuery) -> ServiceResult<Vec<User>> {
        require_admin(actor)?;
        Ok(SqliteUserRepository::new(self.conn).list_users(query)?)
    }

    pub fn change_role(&self, actor: &User, user_id: UserId, role: UserRole) -> ServiceResult<User> {
        require_admin(actor)?;
        let target = self.require_user(user_id)?;
        if target.role == role {
            return Ok(target);
        }
        if target.role == UserRole::Admin {
            if target.id == actor.id {
                return Err(ServiceError::forbidden("you cannot demote yourself"));
            }
            self.ensure_not_last_admin(&target, "demote")?;
        }

        let users = SqliteUserRepository::new(self.conn);
        users.set_role(user_id, role)?;
        self.audit(
            actor,
            "admin_change_role",
            user_id,
            format!("{} -> {}", target.role.as_str(), role.as_str()),
        )?;
        self.require_user(user_id)
    }

    /// Suspends an account and revokes its sessions.
    pub fn suspend(&self, actor: &User, user_id: UserId, reason: Option<&str>) -> ServiceResult<User> {
        require_admin(actor)?;
        if user_id == actor.id {
            return Err(ServiceError::forbidden("you cannot suspend yourself"));
        }
        self.require_user(user_id)?;
        SqliteUserRepository::new(self.conn).set_suspended(user_id, true)?;
        let revoked = SqliteSessionRepository::new(self.conn).delete_user_sessions(user_id, None)?;
        self.audit(
            actor,
            "admin_suspend_user",
            user_id,
            format!("reason={} sessions_revoked={}", reason.unwrap_or("-"), revoked),
        )?;
        self.require_user(user_id)
    }

    pub fn unsuspend(&self, actor: &User, user_id: UserId) -> ServiceResult<User> {
        require_admin(actor)?;
        self.require_user(user_id)?;
        SqliteUserRepository::new(self.conn).set_suspended(user_id, false)?;
        self.audit(actor, "admin_unsuspend_user", user_id, String::new())?;
        self.require_user(user_id)
    }

    pub fn delete_user(&self, actor: &User, user_id: UserId) -> ServiceResult<()> {
        require_admin(actor)?;
        if user_id == actor.id {
            return Err(ServiceError::forbidden("you cannot delete yourself"));
        }
        let target = self.require_user(user_id)?;
        if target.role == UserRole::Admin {
            self.ensure_not_last_admin(&target, "delete")?;
        }
        SqliteUserRepository::new(self.conn).delete_user(user_id)?;
        self.audit(actor, "admin_delete_user", user_id, target.username)?;
        Ok(())
    }

    /// Runs the health probes and stores each reading as a metric.
    pub fn system_health(&self, actor: &User, upload_dir: &Path) -> ServiceResult<SystemHealth> {
        require_admin(actor)?;
        let health = SqliteHealthRepository::new(self.conn);

        let integrity = health.quick_check()?;
        let integrity_ok = integrity.len() == 1 && integrity[0] == "ok";
        let database_size_bytes = health.database_size_bytes()?;
        let table_counts = health.table_counts()?;
        let upload_dir_writable = probe_writable(upload_dir);

        let metrics = SqliteSecurityRepository::new(self.conn);
        metrics.record_metric(METRIC_DB_SIZE, database_size_bytes as f64)?;
        metrics.record_metric(METRIC_DB_INTEGRITY, flag(integrity_ok))?;
        metrics.record_metric(METRIC_UPLOAD_WRITABLE, flag(upload_dir_writable))?;
        for count in &table_counts {
            match count.label.as_str() {
                "users" => metrics.record_metric(METRIC_USER_COUNT, count.count as f64)?,
                "articles" => metrics.record_metric(METRIC_ARTICLE_COUNT, count.count as f64)?,
                _ => continue,
            };
        }

        let status = if integrity_ok && upload_dir_writable {
            "healthy"
        } else {
            warn!(
                "event=system_health module=admin status=degraded integrity_ok={} upload_dir_writable={}",
                integrity_ok, upload_dir_writable
            );
            "degraded"
        };
        Ok(SystemHealth {
            status,
            database_reachable: true,
            integrity,
            database_size_bytes,
            table_counts,
            upload_dir_writable,
            logging: logging_status().map(|setup| setup.to_string()),
            checked_at: now_epoch_ms(),
        })
    }

    pub fn metric_history(
        &self,
        actor: &User,
        name: Option<&str>,
        page: Page,
    ) -> ServiceResult<Vec<HealthMetric>> {
        require_admin(actor)?;
        Ok(SqliteSecurityRepository::new(self.conn).list_metrics(name, page)?)
    }

    fn require_user(&self, id: UserId) -> ServiceResult<User> {
        SqliteUserRepository::new(self.conn)
            .get_user(id)?
            .ok_or_else(|| ServiceError::not_found("user", id))
    }

    fn ensure_not_last_admin(&self, target: &User, verb: &str) -> ServiceResult<()> {
        if SqliteUserRepository::new(self.conn).count_by_role(UserRole::Admin)? <= 1 {
            return Err(ServiceError::Conflict(format!(
                "cannot {verb} the last admin `{}`",
                target.username
            )));
        }
        Ok(())
    }

    fn audit(&self, actor: &User, action: &str, user_id: UserId, details: String) -> ServiceResult<()> {
        let mut entry = NewAuditLog::new(actor.id, action, "user", Some(user_id));
        if !details.is_empty() {
            entry = entry.details(details);
        }
        SecurityMonitor::new(self.conn).record_audit(&entry)?;
        info!("event={action} module=admin status=ok actor_id={} user_id={user_id}", actor.id);
        Ok(())
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Creates the directory if needed and round-trips a probe file.
fn probe_writable(dir: &Path) -> bool {
    if fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(format!(".health-{}", uuid::Uuid::new_v4()));
    match fs::write(&probe, b"ok") {
        Ok(()) => fs::remove_file(&probe).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::probe_writable;

    #[test]
    fn probe_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        assert!(probe_writable(&nested));
        assert!(nested.is_dir());
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 0);
    }
}
