//! Bookmark handlers.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Router,
};
use inkwell_core::model::article::{Article, ArticleId};
use inkwell_core::repo::Page;
use inkwell_core::service::bookmark_service::BookmarkService;
use serde::Serialize;

use crate::extract::{PathParam, QueryParams};
use crate::middleware::{require_user, AuthUser};
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list))
        .route("/:article_id", post(add).delete(remove))
}

#[derive(Debug, Serialize)]
pub struct BookmarkChange {
    pub bookmarked: bool,
    /// False when the request did not change anything.
    pub changed: bool,
}

async fn list(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<Article>> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| BookmarkService::new(conn).list(&user, page))?)
}

async fn add(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(article_id): PathParam<ArticleId>,
) -> ApiResult<BookmarkChange> {
    let user = require_user(auth)?;
    let changed = state.with_conn(|conn| BookmarkService::new(conn).add(&user, article_id))?;
    ok(BookmarkChange {
        bookmarked: true,
        changed,
    })
}

async fn remove(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(article_id): PathParam<ArticleId>,
) -> ApiResult<BookmarkChange> {
    let user = require_user(auth)?;
    let changed = state.with_conn(|conn| BookmarkService::new(conn).remove(&user, article_id))?;
    ok(BookmarkChange {
        bookmarked: false,
        changed,
    })
}
