//! Reporting and moderator handlers.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Router,
};
use inkwell_core::model::moderation::{
    ContentFlag, ModerationAction, ModerationStats, NewReport, Report, ReportId, ReportStatus,
};
use inkwell_core::repo::Page;
use inkwell_core::service::content_filter::ScanResult;
use inkwell_core::service::moderation_service::{ActionInput, ModerationService, ResolveInput};
use serde::Deserialize;

use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::middleware::{require_user, AuthUser};
use crate::response::{created, done, ok, ApiResult, Created};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/reports", get(report_queue).post(report))
        .route("/reports/:id/resolve", post(resolve_report))
        .route("/reports/:id/dismiss", post(dismiss_report))
        .route("/actions", get(actions).post(apply_action))
        .route("/flags", get(flag_queue))
        .route("/flags/:id/review", post(review_flag))
        .route("/stats", get(stats))
        .route("/scan", post(scan))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQueueParams {
    pub status: Option<ReportStatus>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct FlagQueueParams {
    #[serde(default = "open_only_default")]
    pub open_only: bool,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

fn open_only_default() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct DismissRequest {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub text: String,
}

async fn report(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    JsonBody(input): JsonBody<NewReport>,
) -> Created<Report> {
    let user = require_user(auth)?;
    created(state.with_conn(|conn| ModerationService::new(conn).report(&user, &input))?)
}

async fn report_queue(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<ReportQueueParams>,
) -> ApiResult<Vec<Report>> {
    let user = require_user(auth)?;
    let page = Page {
        limit: params.limit,
        offset: params.offset,
    };
    ok(state.with_conn(|conn| ModerationService::new(conn).report_queue(&user, params.status, page))?)
}

async fn resolve_report(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<ReportId>,
    JsonBody(input): JsonBody<ResolveInput>,
) -> ApiResult<Report> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| ModerationService::new(conn).resolve_report(&user, id, &input))?)
}

async fn dismiss_report(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<ReportId>,
    JsonBody(body): JsonBody<DismissRequest>,
) -> ApiResult<Report> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| {
        ModerationService::new(conn).dismiss_report(&user, id, body.note.as_deref())
    })?)
}

async fn apply_action(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    JsonBody(input): JsonBody<ActionInput>,
) -> Created<ModerationAction> {
    let user = require_user(auth)?;
    created(state.with_conn(|conn| ModerationService::new(conn).apply_action(&user, &input))?)
}

async fn actions(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<ModerationAction>> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| ModerationService::new(conn).actions(&user, page))?)
}

async fn flag_queue(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<FlagQueueParams>,
) -> ApiResult<Vec<ContentFlag>> {
    let user = require_user(auth)?;
    let page = Page {
        limit: params.limit,
        offset: params.offset,
    };
    ok(state.with_conn(|conn| ModerationService::new(conn).flag_queue(&user, params.open_only, page))?)
}

async fn review_flag(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<()> {
    let user = require_user(auth)?;
    state.with_conn(|conn| ModerationService::new(conn).review_flag(&user, id))?;
    done("flag reviewed")
}

async fn stats(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
) -> ApiResult<ModerationStats> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| ModerationService::new(conn).stats(&user))?)
}

async fn scan(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    JsonBody(body): JsonBody<ScanRequest>,
) -> ApiResult<ScanResult> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| ModerationService::new(conn).preview_scan(&user, &body.text))?)
}
