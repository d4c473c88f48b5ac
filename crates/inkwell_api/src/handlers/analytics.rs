//! Platform and author analytics handlers.

use axum::{
    extract::{Extension, State},
    routing::get,
    Router,
};
use inkwell_core::model::analytics::{
    ArticleAnalytics, AuthorAnalytics, AuthorRank, GrowthPoint, PlatformOverview, TagStat,
};
use inkwell_core::model::article::{ArticleId, ScoredArticle};
use inkwell_core::service::analytics_service::AnalyticsService;

use super::feed::WindowParams;
use crate::extract::{PathParam, QueryParams};
use crate::middleware::{require_user, AuthUser};
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/growth", get(growth))
        .route("/top-articles", get(top_articles))
        .route("/top-authors", get(top_authors))
        .route("/tags", get(tag_stats))
        .route("/articles/:id", get(article))
        .route("/me", get(author))
}

async fn overview(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<WindowParams>,
) -> ApiResult<PlatformOverview> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| AnalyticsService::new(conn).overview(&user, params.days))?)
}

async fn growth(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(params): QueryParams<WindowParams>,
) -> ApiResult<Vec<GrowthPoint>> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| AnalyticsService::new(conn).growth(&user, params.days))?)
}

async fn top_articles(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<WindowParams>,
) -> ApiResult<Vec<ScoredArticle>> {
    ok(state.with_conn(|conn| AnalyticsService::new(conn).top_articles(params.days, params.limit))?)
}

async fn top_authors(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<WindowParams>,
) -> ApiResult<Vec<AuthorRank>> {
    ok(state.with_conn(|conn| AnalyticsService::new(conn).top_authors(params.days, params.limit))?)
}

async fn tag_stats(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<WindowParams>,
) -> ApiResult<Vec<TagStat>> {
    ok(state.with_conn(|conn| AnalyticsService::new(conn).tag_stats(params.limit))?)
}

async fn article(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<ArticleId>,
    QueryParams(params): QueryParams<WindowParams>,
) -> ApiResult<ArticleAnalytics> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| AnalyticsService::new(conn).article(&user, id, params.days))?)
}

async fn author(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
) -> ApiResult<AuthorAnalytics> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| AnalyticsService::new(conn).author(&user))?)
}
