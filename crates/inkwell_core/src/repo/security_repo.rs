//! Security event, audit log and health metric persistence.
//!
//! # Invariants
//! - All three tables are append-only from the application's point of view.

use super::{parse_column, Page, RepoResult};
use crate::model::security::{
    event_types, AuditLogEntry, HealthMetric, NewAuditLog, NewSecurityEvent, SecurityEvent,
    Severity, SuspiciousIp,
};
use crate::model::user::UserId;
use crate::model::LabelCount;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

/// Filters for event listing.
#[derive(Debug, Clone, Default)]
pub struct SecurityEventQuery {
    pub event_type: Option<String>,
    pub min_severity: Option<Severity>,
    pub since_ms: Option<i64>,
    pub page: Page,
}

/// Filters for audit log listing.
#[derive(Debug, Clone, Default)]
pub struct AuditLogQuery {
    pub user_id: Option<UserId>,
    pub resource_type: Option<String>,
    pub page: Page,
}

pub trait SecurityRepository {
    fn log_event(&self, event: &NewSecurityEvent) -> RepoResult<i64>;
    fn list_events(&self, query: &SecurityEventQuery) -> RepoResult<Vec<SecurityEvent>>;
    /// IPs with more than `threshold` failed logins since `since_ms`.
    fn suspicious_ips(&self, since_ms: i64, threshold: i64) -> RepoResult<Vec<SuspiciousIp>>;
    fn counts_by_type(&self, since_ms: i64) -> RepoResult<Vec<LabelCount>>;
    fn counts_by_severity(&self, since_ms: i64) -> RepoResult<Vec<LabelCount>>;
    fn record_audit(&self, entry: &NewAuditLog) -> RepoResult<i64>;
    fn list_audit(&self, query: &AuditLogQuery) -> RepoResult<Vec<AuditLogEntry>>;
    fn record_metric(&self, name: &str, value: f64) -> RepoResult<i64>;
    fn list_metrics(&self, name: Option<&str>, page: Page) -> RepoResult<Vec<HealthMetric>>;
}

pub struct SqliteSecurityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSecurityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn grouped_counts(&self, column: &str, since_ms: i64) -> RepoResult<Vec<LabelCount>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column}, COUNT(*) AS total
             FROM security_events
             WHERE created_at >= ?1
             GROUP BY {column}
             ORDER BY total DESC, {column} ASC;"
        ))?;
        let mut rows = stmt.query([since_ms])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            counts.push(LabelCount {
                label: row.get(0)?,
                count: row.get(1)?,
            });
        }
        Ok(counts)
    }
}

impl SecurityRepository for SqliteSecurityRepository<'_> {
    fn log_event(&self, event: &NewSecurityEvent) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO security_events (event_type, user_id, ip_address, details, severity)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                event.event_type.as_str(),
                event.user_id,
                event.ip_address.as_deref(),
                event.details.as_deref(),
                event.severity.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_events(&self, query: &SecurityEventQuery) -> RepoResult<Vec<SecurityEvent>> {
        let mut sql = String::from(
            "SELECT id, event_type, user_id, ip_address, details, severity, created_at
             FROM security_events
             WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(event_type) = query.event_type.as_ref() {
            sql.push_str(" AND event_type = ?");
            bind_values.push(Value::Text(event_type.clone()));
        }
        if let Some(min_severity) = query.min_severity {
            let allowed: Vec<&str> = Severity::ALL
                .iter()
                .filter(|severity| **severity >= min_severity)
                .map(|severity| severity.as_str())
                .collect();
            sql.push_str(&format!(
                " AND severity IN ({})",
                vec!["?"; allowed.len()].join(", ")
            ));
            bind_values.extend(allowed.into_iter().map(|value| Value::Text(value.to_string())));
        }
        if let Some(since_ms) = query.since_ms {
            sql.push_str(" AND created_at >= ?");
            bind_values.push(Value::Integer(since_ms));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        query.page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }

    fn suspicious_ips(&self, since_ms: i64, threshold: i64) -> RepoResult<Vec<SuspiciousIp>> {
        let mut stmt = self.conn.prepare(
            "SELECT ip_address, COUNT(*) AS attempts, MAX(created_at) AS last_seen
             FROM security_events
             WHERE event_type = ?1
               AND created_at >= ?2
               AND ip_address IS NOT NULL
             GROUP BY ip_address
             HAVING COUNT(*) > ?3
             ORDER BY attempts DESC, last_seen DESC;",
        )?;
        let mut rows = stmt.query(params![event_types::FAILED_LOGIN, since_ms, threshold])?;
        let mut ips = Vec::new();
        while let Some(row) = rows.next()? {
            ips.push(SuspiciousIp {
                ip_address: row.get(0)?,
                failed_attempts: row.get(1)?,
                last_seen: row.get(2)?,
            });
        }
        Ok(ips)
    }

    fn counts_by_type(&self, since_ms: i64) -> RepoResult<Vec<LabelCount>> {
        self.grouped_counts("event_type", since_ms)
    }

    fn counts_by_severity(&self, since_ms: i64) -> RepoResult<Vec<LabelCount>> {
        self.grouped_counts("severity", since_ms)
    }

    fn record_audit(&self, entry: &NewAuditLog) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO audit_logs (user_id, action, resource_type, resource_id, details, ip_address)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                entry.user_id,
                entry.action.as_str(),
                entry.resource_type.as_str(),
                entry.resource_id,
                entry.details.as_deref(),
                entry.ip_address.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_audit(&self, query: &AuditLogQuery) -> RepoResult<Vec<AuditLogEntry>> {
        let mut sql = String::from(
            "SELECT id, user_id, action, resource_type, resource_id, details, ip_address, created_at
             FROM audit_logs
             WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(user_id) = query.user_id {
            sql.push_str(" AND user_id = ?");
            bind_values.push(Value::Integer(user_id));
        }
        if let Some(resource_type) = query.resource_type.as_ref() {
            sql.push_str(" AND resource_type = ?");
            bind_values.push(Value::Text(resource_type.clone()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        query.page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(AuditLogEntry {
                id: row.get("id")?,
                user_id: row.get("user_id")?,
                action: row.get("action")?,
                resource_type: row.get("resource_type")?,
                resource_id: row.get("resource_id")?,
                details: row.get("details")?,
                ip_address: row.get("ip_address")?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(entries)
    }

    fn record_metric(&self, name: &str, value: f64) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO system_health_metrics (metric_name, metric_value) VALUES (?1, ?2);",
            params![name, value],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_metrics(&self, name: Option<&str>, page: Page) -> RepoResult<Vec<HealthMetric>> {
        let mut sql = String::from(
            "SELECT id, metric_name, metric_value, recorded_at
             FROM system_health_metrics
             WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(name) = name {
            sql.push_str(" AND metric_name = ?");
            bind_values.push(Value::Text(name.to_string()));
        }
        sql.push_str(" ORDER BY recorded_at DESC, id DESC");
        page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut metrics = Vec::new();
        while let Some(row) = rows.next()? {
            metrics.push(HealthMetric {
                id: row.get(0)?,
                name: row.get(1)?,
                value: row.get(2)?,
                recorded_at: row.get(3)?,
            });
        }
        Ok(metrics)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<SecurityEvent> {
    let severity_text: String = row.get("severity")?;
    Ok(SecurityEvent {
        id: row.get("id")?,
        event_type: row.get("event_type")?,
        user_id: row.get("user_id")?,
        ip_address: row.get("ip_address")?,
        details: row.get("details")?,
        severity: parse_column(&severity_text, "security_events.severity", Severity::parse)?,
        created_at: row.get("created_at")?,
    })
}
