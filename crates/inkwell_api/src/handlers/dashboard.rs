//! Author dashboard and bulk article operations.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Router,
};
use inkwell_core::model::analytics::AuthorDashboard;
use inkwell_core::model::article::ArticleId;
use inkwell_core::service::dashboard_service::{BulkAction, BulkOutcome, DashboardService};
use serde::Deserialize;

use crate::extract::JsonBody;
use crate::middleware::{require_user, AuthUser};
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(author_dashboard))
        .route("/bulk", post(bulk_operations))
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub action: BulkAction,
    pub ids: Vec<ArticleId>,
}

async fn author_dashboard(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
) -> ApiResult<AuthorDashboard> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| DashboardService::new(conn).author_dashboard(&user))?)
}

async fn bulk_operations(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    JsonBody(body): JsonBody<BulkRequest>,
) -> ApiResult<BulkOutcome> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| {
        DashboardService::new(conn).bulk_operations(&user, body.action, &body.ids)
    })?)
}
