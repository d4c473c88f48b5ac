//! Security monitoring handlers. Admin only.

use axum::{
    extract::{Extension, State},
    routing::get,
    Router,
};
use inkwell_core::db::now_epoch_ms;
use inkwell_core::model::security::{AuditLogEntry, SecurityEvent, Severity, SuspiciousIp};
use inkwell_core::model::user::UserId;
use inkwell_core::repo::security_repo::{AuditLogQuery, SecurityEventQuery};
use inkwell_core::repo::Page;
use inkwell_core::service::security_monitor::{SecurityMonitor, SecuritySummary};
use serde::Deserialize;

use crate::extract::QueryParams;
use crate::middleware::{require_user, AuthUser};
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

const HOUR_MS: i64 = 60 * 60 * 1000;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/suspicious-ips", get(suspicious_ips))
        .route("/events", get(events))
        .route("/audit", get(audit_log))
}

#[derive(Debug, Default, Deserialize)]
pub struct SuspiciousParams {
    pub window_minutes: Option<u32>,
    pub threshold: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventParams {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub min_severity: Option<Severity>,
    pub since_hours: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditParams {
    pub user_id: Option<UserId>,
    pub resource_type: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

async fn summary(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
) -> ApiResult<SecuritySummary> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| SecurityMonitor::new(conn).summary(&user))?)
}

async fn suspicious_ips(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<SuspiciousParams>,
) -> ApiResult<Vec<SuspiciousIp>> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| {
        SecurityMonitor::new(conn).suspicious_ips(&user, params.window_minutes, params.threshold)
    })?)
}

async fn events(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<EventParams>,
) -> ApiResult<Vec<SecurityEvent>> {
    let user = require_user(auth)?;
    let query = SecurityEventQuery {
        event_type: params.event_type.filter(|value| !value.trim().is_empty()),
        min_severity: params.min_severity,
        since_ms: params
            .since_hours
            .map(|hours| now_epoch_ms() - i64::from(hours) * HOUR_MS),
        page: Page {
            limit: params.limit,
            offset: params.offset,
        },
    };
    ok(state.with_conn(|conn| SecurityMonitor::new(conn).recent_events(&user, &query))?)
}

async fn audit_log(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<AuditParams>,
) -> ApiResult<Vec<AuditLogEntry>> {
    let user = require_user(auth)?;
    let query = AuditLogQuery {
        user_id: params.user_id,
        resource_type: params.resource_type.filter(|value| !value.trim().is_empty()),
        page: Page {
            limit: params.limit,
            offset: params.offset,
        },
    };
    ok(state.with_conn(|conn| SecurityMonitor::new(conn).audit_log(&user, &query))?)
}
