//! Security events, audit trail and health metric records.

use super::user::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Self::Info, Self::Warning, Self::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Well-known `security_events.event_type` values.
pub mod event_types {
    pub const LOGIN: &str = "login";
    pub const FAILED_LOGIN: &str = "failed_login";
    pub const LOGOUT: &str = "logout";
    pub const REGISTER: &str = "register";
    pub const PASSWORD_CHANGED: &str = "password_changed";
    pub const SUSPENDED_LOGIN: &str = "suspended_login";
    pub const PERMISSION_DENIED: &str = "permission_denied";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityEvent {
    pub id: i64,
    pub event_type: String,
    pub user_id: Option<UserId>,
    pub ip_address: Option<String>,
    pub details: Option<String>,
    pub severity: Severity,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSecurityEvent {
    pub event_type: String,
    pub user_id: Option<UserId>,
    pub ip_address: Option<String>,
    pub details: Option<String>,
    pub severity: Severity,
}

impl NewSecurityEvent {
    pub fn new(event_type: impl Into<String>, severity: Severity) -> Self {
        Self {
            event_type: event_type.into(),
            user_id: None,
            ip_address: None,
            details: None,
            severity,
        }
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn ip(mut self, ip_address: Option<&str>) -> Self {
        self.ip_address = ip_address.map(str::to_string);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspiciousIp {
    pub ip_address: String,
    pub failed_attempts: i64,
    pub last_seen: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: Option<UserId>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditLog {
    pub user_id: Option<UserId>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

impl NewAuditLog {
    pub fn new(
        user_id: UserId,
        action: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: Option<i64>,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id,
            details: None,
            ip_address: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthMetric {
    pub id: i64,
    pub name: String,
    pub value: f64,
    pub recorded_at: i64,
}
