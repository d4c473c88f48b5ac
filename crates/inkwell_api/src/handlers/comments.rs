//! Comment handlers.

use axum::{
    extract::{Extension, State},
    routing::{get, post, put},
    Router,
};
use inkwell_core::model::article::ArticleId;
use inkwell_core::model::engagement::{Comment, CommentId};
use inkwell_core::service::comment_service::{CommentService, NewCommentInput};
use serde::Deserialize;

use crate::extract::{JsonBody, PathParam};
use crate::middleware::{require_user, AuthUser};
use crate::response::{created, done, ok, ApiResult, Created};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(create))
        .route("/article/:article_id", get(list_for_article))
        .route("/:id", put(edit).delete(delete_one))
}

#[derive(Debug, Deserialize)]
pub struct EditCommentRequest {
    pub content: String,
}

async fn create(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    JsonBody(input): JsonBody<NewCommentInput>,
) -> Created<Comment> {
    let user = require_user(auth)?;
    created(state.with_conn(|conn| CommentService::new(conn).create(&user, &input))?)
}

async fn list_for_article(
    State(state): State<SharedState>,
    PathParam(article_id): PathParam<ArticleId>,
) -> ApiResult<Vec<Comment>> {
    ok(state.with_conn(|conn| CommentService::new(conn).list_for_article(article_id))?)
}

async fn edit(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<CommentId>,
    JsonBody(body): JsonBody<EditCommentRequest>,
) -> ApiResult<Comment> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| CommentService::new(conn).edit(&user, id, &body.content))?)
}

async fn delete_one(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<CommentId>,
) -> ApiResult<()> {
    let user = require_user(auth)?;
    state.with_conn(|conn| CommentService::new(conn).delete(&user, id))?;
    done("comment deleted")
}
