//! Clap handlers.

use axum::{
    extract::{Extension, State},
    routing::post,
    Router,
};
use inkwell_core::model::article::ArticleId;
use inkwell_core::model::engagement::{ClapOutcome, ClapSummary};
use inkwell_core::service::clap_service::ClapService;
use serde::Deserialize;

use crate::extract::{JsonBody, PathParam};
use crate::middleware::{require_user, AuthUser};
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new().route("/:article_id", post(clap).get(summary))
}

#[derive(Debug, Deserialize)]
pub struct ClapRequest {
    #[serde(default = "one_clap")]
    pub count: i64,
}

fn one_clap() -> i64 {
    1
}

async fn clap(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(article_id): PathParam<ArticleId>,
    JsonBody(body): JsonBody<ClapRequest>,
) -> ApiResult<ClapOutcome> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| ClapService::new(conn).clap(&user, article_id, body.count))?)
}

async fn summary(
    State(state): State<SharedState>,
    PathParam(article_id): PathParam<ArticleId>,
) -> ApiResult<ClapSummary> {
    ok(state.with_conn(|conn| ClapService::new(conn).summary(article_id))?)
}
