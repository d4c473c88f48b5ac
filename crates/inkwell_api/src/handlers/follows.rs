//! Follow graph handlers.

use axum::{
    extract::{Extension, State},
    routing::get,
    Router,
};
use inkwell_core::model::engagement::FollowStatus;
use inkwell_core::model::user::UserId;
use inkwell_core::service::follow_service::FollowService;

use crate::extract::PathParam;
use crate::middleware::{require_user, AuthUser};
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new().route("/:user_id", get(status).post(follow).delete(unfollow))
}

async fn follow(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(user_id): PathParam<UserId>,
) -> ApiResult<FollowStatus> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| FollowService::new(conn).follow(&user, user_id))?)
}

async fn unfollow(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(user_id): PathParam<UserId>,
) -> ApiResult<FollowStatus> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| FollowService::new(conn).unfollow(&user, user_id))?)
}

async fn status(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(user_id): PathParam<UserId>,
) -> ApiResult<FollowStatus> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| FollowService::new(conn).status(user.id, user_id))?)
}
