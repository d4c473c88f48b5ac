//! Profile handlers.

use axum::{
    extract::{Extension, State},
    routing::get,
    Router,
};
use inkwell_core::model::article::Article;
use inkwell_core::model::user::{ProfileUpdate, PublicUser, User, UserId};
use inkwell_core::repo::Page;
use inkwell_core::service::user_service::{Profile, UserService};
use serde::Deserialize;

use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::middleware::{require_user, AuthUser};
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/search", get(search))
        .route("/me", axum::routing::put(update_profile))
        .route("/by-username/:username", get(profile_by_username))
        .route("/:id", get(profile))
        .route("/:id/articles", get(articles))
        .route("/:id/followers", get(followers))
        .route("/:id/following", get(following))
}

#[derive(Debug, Deserialize)]
pub struct UserSearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

async fn profile(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<UserId>,
) -> ApiResult<Profile> {
    let viewer = auth.map(|AuthUser(user)| user);
    ok(state.with_conn(|conn| UserService::new(conn).profile(viewer.as_ref(), id))?)
}

async fn profile_by_username(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(username): PathParam<String>,
) -> ApiResult<Profile> {
    let viewer = auth.map(|AuthUser(user)| user);
    ok(state.with_conn(|conn| UserService::new(conn).profile_by_username(viewer.as_ref(), &username))?)
}

async fn update_profile(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> ApiResult<User> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| UserService::new(conn).update_profile(&user, &update))?)
}

async fn articles(
    State(state): State<SharedState>,
    PathParam(id): PathParam<UserId>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<Article>> {
    ok(state.with_conn(|conn| UserService::new(conn).published_articles(id, page))?)
}

async fn followers(
    State(state): State<SharedState>,
    PathParam(id): PathParam<UserId>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<PublicUser>> {
    ok(state.with_conn(|conn| UserService::new(conn).followers(id, page))?)
}

async fn following(
    State(state): State<SharedState>,
    PathParam(id): PathParam<UserId>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<PublicUser>> {
    ok(state.with_conn(|conn| UserService::new(conn).following(id, page))?)
}

pub(crate) async fn search(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<UserSearchParams>,
) -> ApiResult<Vec<PublicUser>> {
    ok(state.with_conn(|conn| UserService::new(conn).search(&params.q, params.limit))?)
}
