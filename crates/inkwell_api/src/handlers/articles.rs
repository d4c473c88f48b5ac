//! Article CRUD, lifecycle and reading telemetry handlers.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Router,
};
use inkwell_core::model::article::{Article, ArticleId, ArticleInput, ArticleStatus};
use inkwell_core::model::engagement::{ClapSummary, Comment, ReadProgress};
use inkwell_core::model::user::UserId;
use inkwell_core::repo::Page;
use inkwell_core::service::article_service::{ArticleDetail, ArticleFilter, ArticleService};
use inkwell_core::service::clap_service::ClapService;
use inkwell_core::service::comment_service::CommentService;
use serde::{Deserialize, Serialize};

use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::middleware::{require_user, AuthUser, ClientIp};
use crate::response::{created, done, ok, ApiResult, Created};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/slug/:slug", get(get_by_slug))
        .route("/:id", get(get_one).put(update).delete(delete_one))
        .route("/:id/publish", post(publish))
        .route("/:id/unpublish", post(unpublish))
        .route("/:id/archive", post(archive))
        .route("/:id/view", post(record_view))
        .route("/:id/read", post(record_read))
        .route("/:id/comments", get(comments))
        .route("/:id/claps", get(claps))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub author_id: Option<UserId>,
    pub tag: Option<String>,
    pub publication_id: Option<i64>,
    pub status: Option<ArticleStatus>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Serialize)]
pub struct ViewRecorded {
    pub view_count: i64,
}

async fn list(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Vec<Article>> {
    let viewer = auth.map(|AuthUser(user)| user);
    let filter = ArticleFilter {
        author_id: params.author_id,
        tag: params.tag,
        publication_id: params.publication_id,
        status: params.status,
        page: Page {
            limit: params.limit,
            offset: params.offset,
        },
    };
    ok(state.with_conn(|conn| ArticleService::new(conn).list(viewer.as_ref(), &filter))?)
}

async fn create(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    JsonBody(input): JsonBody<ArticleInput>,
) -> Created<Article> {
    let user = require_user(auth)?;
    created(state.with_conn(|conn| ArticleService::new(conn).create(&user, &input))?)
}

async fn get_one(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<ArticleId>,
) -> ApiResult<ArticleDetail> {
    let viewer = auth.map(|AuthUser(user)| user);
    ok(state.with_conn(|conn| ArticleService::new(conn).get(viewer.as_ref(), id))?)
}

async fn get_by_slug(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(slug): PathParam<String>,
) -> ApiResult<ArticleDetail> {
    let viewer = auth.map(|AuthUser(user)| user);
    ok(state.with_conn(|conn| ArticleService::new(conn).get_by_slug(viewer.as_ref(), &slug))?)
}

async fn update(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<ArticleId>,
    JsonBody(input): JsonBody<ArticleInput>,
) -> ApiResult<Article> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| ArticleService::new(conn).update(&user, id, &input))?)
}

async fn delete_one(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<ArticleId>,
) -> ApiResult<()> {
    let user = require_user(auth)?;
    state.with_conn(|conn| ArticleService::new(conn).delete(&user, id))?;
    done("article deleted")
}

async fn publish(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<ArticleId>,
) -> ApiResult<Article> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| ArticleService::new(conn).publish(&user, id))?)
}

async fn unpublish(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<ArticleId>,
) -> ApiResult<Article> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| ArticleService::new(conn).unpublish(&user, id))?)
}

async fn archive(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<ArticleId>,
) -> ApiResult<Article> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| ArticleService::new(conn).archive(&user, id))?)
}

async fn record_view(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    Extension(ip): Extension<ClientIp>,
    PathParam(id): PathParam<ArticleId>,
) -> ApiResult<ViewRecorded> {
    let viewer = auth.map(|AuthUser(user)| user.id);
    let view_count = state
        .with_conn(|conn| ArticleService::new(conn).record_view(id, viewer, ip.as_deref()))?;
    ok(ViewRecorded { view_count })
}

async fn record_read(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<ArticleId>,
    JsonBody(progress): JsonBody<ReadProgress>,
) -> ApiResult<()> {
    let reader = auth.map(|AuthUser(user)| user.id);
    state.with_conn(|conn| ArticleService::new(conn).record_read(id, reader, &progress))?;
    done("read recorded")
}

async fn comments(
    State(state): State<SharedState>,
    PathParam(id): PathParam<ArticleId>,
) -> ApiResult<Vec<Comment>> {
    ok(state.with_conn(|conn| CommentService::new(conn).list_for_article(id))?)
}

async fn claps(
    State(state): State<SharedState>,
    PathParam(id): PathParam<ArticleId>,
) -> ApiResult<ClapSummary> {
    ok(state.with_conn(|conn| ClapService::new(conn).summary(id))?)
}
