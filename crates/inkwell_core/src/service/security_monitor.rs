//! Security event log, suspicious-IP detection and audit trail.
//!
//! # Invariants
//! - Event and audit writes never require a role; reads are admin only.
//! - An IP is suspicious when its failed logins in the window exceed the
//!   threshold (strictly greater).

use super::{require_admin, ServiceError, ServiceResult, DAY_MS};
use crate::db::now_epoch_ms;
use crate::model::security::{
    AuditLogEntry, NewAuditLog, NewSecurityEvent, SecurityEvent, Severity, SuspiciousIp,
};
use crate::model::user::User;
use crate::model::LabelCount;
use crate::repo::security_repo::{
    AuditLogQuery, SecurityEventQuery, SecurityRepository, SqliteSecurityRepository,
};
use crate::repo::Page;
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;

pub const DEFAULT_WINDOW_MINUTES: u32 = 60;
pub const DEFAULT_FAILED_LOGIN_THRESHOLD: i64 = 5;
const MAX_WINDOW_MINUTES: u32 = 7 * 24 * 60;
const RECENT_ALERTS_LIMIT: u32 = 20;

/// Last-24h security overview.
#[derive(Debug, Clone, Serialize)]
pub struct SecuritySummary {
    pub since: i64,
    pub events_by_type: Vec<LabelCount>,
    pub events_by_severity: Vec<LabelCount>,
    pub suspicious_ips: Vec<SuspiciousIp>,
    pub recent_alerts: Vec<SecurityEvent>,
}

pub struct SecurityMonitor<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SecurityMonitor<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn log_event(&self, event: &NewSecurityEvent) -> ServiceResult<i64> {
        let id = SqliteSecurityRepository::new(self.conn).log_event(event)?;
        if event.severity >= Severity::Warning {
            warn!(
                "event=security_event module=security type={} severity={} user_id={:?}",
                event.event_type,
                event.severity.as_str(),
                event.user_id
            );
        }
        Ok(id)
    }

    pub fn record_audit(&self, entry: &NewAuditLog) -> ServiceResult<i64> {
        let id = SqliteSecurityRepository::new(self.conn).record_audit(entry)?;
        info!(
            "event=audit module=security action={} resource={} resource_id={:?}",
            entry.action, entry.resource_type, entry.resource_id
        );
        Ok(id)
    }

    pub fn suspicious_ips(
        &self,
        actor: &User,
        window_minutes: Option<u32>,
        threshold: Option<i64>,
    ) -> ServiceResult<Vec<SuspiciousIp>> {
        require_admin(actor)?;
        let window_minutes = window_minutes.unwrap_or(DEFAULT_WINDOW_MINUTES);
        if window_minutes == 0 || window_minutes > MAX_WINDOW_MINUTES {
            return Err(ServiceError::invalid(format!(
                "window_minutes must be between 1 and {MAX_WINDOW_MINUTES}"
            )));
        }
        let threshold = threshold.unwrap_or(DEFAULT_FAILED_LOGIN_THRESHOLD);
        if threshold < 0 {
            return Err(ServiceError::invalid("threshold must not be negative"));
        }
        let since = now_epoch_ms() - i64::from(window_minutes) * 60 * 1000;
        self.detect_suspicious_ips(since, threshold)
    }

    pub fn summary(&self, actor: &User) -> ServiceResult<SecuritySummary> {
        require_admin(actor)?;
        let repo = SqliteSecurityRepository::new(self.conn);
        let now = now_epoch_ms();
        let since = now - DAY_MS;
        let window_start = now - i64::from(DEFAULT_WINDOW_MINUTES) * 60 * 1000;

        Ok(SecuritySummary {
            since,
            events_by_type: repo.counts_by_type(since)?,
            events_by_severity: repo.counts_by_severity(since)?,
            suspicious_ips: self
                .detect_suspicious_ips(window_start, DEFAULT_FAILED_LOGIN_THRESHOLD)?,
            recent_alerts: repo.list_events(&SecurityEventQuery {
                min_severity: Some(Severity::Warning),
                since_ms: Some(since),
                page: Page::new(RECENT_ALERTS_LIMIT, 0),
                ..SecurityEventQuery::default()
            })?,
        })
    }

    pub fn recent_events(
        &self,
        actor: &User,
        query: &SecurityEventQuery,
    ) -> ServiceResult<Vec<SecurityEvent>> {
        require_admin(actor)?;
        Ok(SqliteSecurityRepository::new(self.conn).list_events(query)?)
    }

    pub fn audit_log(&self, actor: &User, query: &AuditLogQuery) -> ServiceResult<Vec<AuditLogEntry>> {
        require_admin(actor)?;
        Ok(SqliteSecurityRepository::new(self.conn).list_audit(query)?)
    }

    fn detect_suspicious_ips(&self, since: i64, threshold: i64) -> ServiceResult<Vec<SuspiciousIp>> {
        Ok(SqliteSecurityRepository::new(self.conn).suspicious_ips(since, threshold)?)
    }
}
