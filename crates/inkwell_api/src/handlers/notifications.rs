//! Notification inbox handlers. Callers only ever touch their own rows.

use axum::{
    extract::{Extension, State},
    routing::{delete, get, post},
    Router,
};
use inkwell_core::model::notification::{Notification, NotificationId};
use inkwell_core::repo::Page;
use inkwell_core::service::notification_service::NotificationService;
use serde::{Deserialize, Serialize};

use crate::extract::{PathParam, QueryParams};
use crate::middleware::{require_user, AuthUser};
use crate::response::{done, ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
        .route("/:id", delete(delete_one))
}

#[derive(Debug, Default, Deserialize)]
pub struct InboxParams {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: usize,
}

async fn list(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<InboxParams>,
) -> ApiResult<Vec<Notification>> {
    let user = require_user(auth)?;
    let page = Page {
        limit: params.limit,
        offset: params.offset,
    };
    ok(state.with_conn(|conn| NotificationService::new(conn).list(user.id, params.unread_only, page))?)
}

async fn unread_count(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
) -> ApiResult<UnreadCount> {
    let user = require_user(auth)?;
    let unread = state.with_conn(|conn| NotificationService::new(conn).unread_count(user.id))?;
    ok(UnreadCount { unread })
}

async fn mark_read(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<NotificationId>,
) -> ApiResult<()> {
    let user = require_user(auth)?;
    state.with_conn(|conn| NotificationService::new(conn).mark_read(user.id, id))?;
    done("notification marked read")
}

async fn mark_all_read(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
) -> ApiResult<MarkedRead> {
    let user = require_user(auth)?;
    let updated = state.with_conn(|conn| NotificationService::new(conn).mark_all_read(user.id))?;
    ok(MarkedRead { updated })
}

async fn delete_one(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<NotificationId>,
) -> ApiResult<()> {
    let user = require_user(auth)?;
    state.with_conn(|conn| NotificationService::new(conn).delete(user.id, id))?;
    done("notification deleted")
}
