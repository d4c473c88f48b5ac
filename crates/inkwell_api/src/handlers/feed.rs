//! Feed handlers: personalized, latest and trending.

use axum::{
    extract::{Extension, State},
    routing::get,
    Router,
};
use inkwell_core::model::article::{Article, ScoredArticle};
use inkwell_core::repo::Page;
use inkwell_core::service::feed_service::FeedService;
use serde::Deserialize;

use crate::extract::QueryParams;
use crate::middleware::{require_user, AuthUser};
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(personalized))
        .route("/latest", get(latest))
        .route("/trending", get(trending))
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    pub days: Option<u32>,
    pub limit: Option<u32>,
}

async fn personalized(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<Article>> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| FeedService::new(conn).personalized(&user, page))?)
}

async fn latest(
    State(state): State<SharedState>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<Article>> {
    ok(state.with_conn(|conn| FeedService::new(conn).latest(page))?)
}

async fn trending(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<WindowParams>,
) -> ApiResult<Vec<ScoredArticle>> {
    ok(state.with_conn(|conn| FeedService::new(conn).trending(params.days, params.limit))?)
}
