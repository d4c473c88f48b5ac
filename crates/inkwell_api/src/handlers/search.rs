//! Search handlers over articles, users and tags.

use axum::{extract::State, routing::get, Router};
use inkwell_core::{search_articles, SearchHit, SearchQuery};
use serde::Deserialize;

use super::{tags, users};
use crate::extract::QueryParams;
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/articles", get(articles))
        .route("/users", get(users::search))
        .route("/tags", get(tags::search))
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleSearchParams {
    #[serde(default)]
    pub q: String,
    pub tag: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
    /// Pass `q` through as a raw FTS5 expression.
    #[serde(default)]
    pub raw: bool,
}

async fn articles(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<ArticleSearchParams>,
) -> ApiResult<Vec<SearchHit>> {
    let query = SearchQuery {
        text: params.q,
        tag: params.tag,
        limit: params.limit,
        offset: params.offset,
        raw_fts_syntax: params.raw,
    };
    ok(state.with_conn(|conn| Ok(search_articles(conn, &query)?))?)
}
