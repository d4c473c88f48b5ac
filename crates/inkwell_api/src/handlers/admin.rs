//! Admin handlers: user management and system health.

use axum::{
    extract::{Extension, State},
    routing::{get, post, put},
    Router,
};
use inkwell_core::model::security::HealthMetric;
use inkwell_core::model::user::{User, UserId, UserRole};
use inkwell_core::repo::user_repo::UserListQuery;
use inkwell_core::repo::Page;
use inkwell_core::service::admin_service::{AdminService, SystemHealth};
use serde::Deserialize;

use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::middleware::{require_user, AuthUser};
use crate::response::{done, ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", axum::routing::delete(delete_user))
        .route("/users/:id/role", put(change_role))
        .route("/users/:id/suspend", post(suspend))
        .route("/users/:id/unsuspend", post(unsuspend))
        .route("/health", get(system_health))
        .route("/metrics", get(metric_history))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub role: Option<UserRole>,
    pub suspended: Option<bool>,
    pub q: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuspendRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricParams {
    pub name: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

async fn list_users(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<UserListParams>,
) -> ApiResult<Vec<User>> {
    let user = require_user(auth)?;
    let query = UserListQuery {
        role: params.role,
        suspended: params.suspended,
        search: params.q.filter(|value| !value.trim().is_empty()),
        page: Page {
            limit: params.limit,
            offset: params.offset,
        },
    };
    ok(state.with_conn(|conn| AdminService::new(conn).list_users(&user, &query))?)
}

async fn change_role(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<UserId>,
    JsonBody(body): JsonBody<RoleRequest>,
) -> ApiResult<User> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| AdminService::new(conn).change_role(&user, id, body.role))?)
}

async fn suspend(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<UserId>,
    JsonBody(body): JsonBody<SuspendRequest>,
) -> ApiResult<User> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| AdminService::new(conn).suspend(&user, id, body.reason.as_deref()))?)
}

async fn unsuspend(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<UserId>,
) -> ApiResult<User> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| AdminService::new(conn).unsuspend(&user, id))?)
}

async fn delete_user(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<UserId>,
) -> ApiResult<()> {
    let user = require_user(auth)?;
    state.with_conn(|conn| AdminService::new(conn).delete_user(&user, id))?;
    done("user deleted")
}

async fn system_health(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
) -> ApiResult<SystemHealth> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| AdminService::new(conn).system_health(&user, &state.uploads.dir))?)
}

async fn metric_history(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<MetricParams>,
) -> ApiResult<Vec<HealthMetric>> {
    let user = require_user(auth)?;
    let page = Page {
        limit: params.limit,
        offset: params.offset,
    };
    ok(state.with_conn(|conn| {
        AdminService::new(conn).metric_history(&user, params.name.as_deref(), page)
    })?)
}
