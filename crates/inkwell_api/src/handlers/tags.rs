//! Tag handlers.

use axum::{extract::State, routing::get, Router};
use inkwell_core::model::article::{Article, TagCount};
use inkwell_core::repo::Page;
use inkwell_core::service::feed_service::FeedService;
use serde::Deserialize;

use crate::extract::{PathParam, QueryParams};
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/popular", get(popular))
        .route("/search", get(search))
        .route("/:tag/articles", get(articles))
}

#[derive(Debug, Default, Deserialize)]
pub struct TagParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

async fn popular(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<TagParams>,
) -> ApiResult<Vec<TagCount>> {
    ok(state.with_conn(|conn| FeedService::new(conn).popular_tags(params.limit))?)
}

pub(crate) async fn search(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<TagParams>,
) -> ApiResult<Vec<TagCount>> {
    ok(state.with_conn(|conn| FeedService::new(conn).search_tags(&params.q, params.limit))?)
}

async fn articles(
    State(state): State<SharedState>,
    PathParam(tag): PathParam<String>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<Article>> {
    ok(state.with_conn(|conn| FeedService::new(conn).tag_articles(&tag, page))?)
}
