//! SEO handlers: article meta, sitemap, robots and slug checks.

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
    Router,
};
use inkwell_core::model::article::ArticleId;
use inkwell_core::service::seo_service::{ArticleMeta, SeoService, SlugAvailability};
use serde::Deserialize;

use crate::error::Result;
use crate::extract::{PathParam, QueryParams};
use crate::response::{ok, ApiResult};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/articles/:slug/meta", get(article_meta))
        .route("/slug-availability", get(slug_availability))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
}

#[derive(Debug, Deserialize)]
pub struct SlugParams {
    pub slug: String,
    pub exclude: Option<ArticleId>,
}

async fn article_meta(
    State(state): State<SharedState>,
    PathParam(slug): PathParam<String>,
) -> ApiResult<ArticleMeta> {
    ok(state.with_conn(|conn| SeoService::new(conn, &state.config.base_url).article_meta(&slug))?)
}

async fn slug_availability(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<SlugParams>,
) -> ApiResult<SlugAvailability> {
    ok(state.with_conn(|conn| {
        SeoService::new(conn, &state.config.base_url).slug_availability(&params.slug, params.exclude)
    })?)
}

pub async fn sitemap(State(state): State<SharedState>) -> Result<impl IntoResponse> {
    let xml = state.with_conn(|conn| SeoService::new(conn, &state.config.base_url).sitemap_xml())?;
    Ok(([(CONTENT_TYPE, "application/xml; charset=utf-8")], xml))
}

pub async fn robots(State(state): State<SharedState>) -> Result<impl IntoResponse> {
    let body = state.with_conn(|conn| Ok(SeoService::new(conn, &state.config.base_url).robots_txt()))?;
    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}
