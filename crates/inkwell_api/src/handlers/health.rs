//! Liveness endpoint and the unknown-route fallback.

use axum::http::Uri;
use serde::Serialize;

use crate::error::AppError;
use crate::response::{ok, ApiResult};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> ApiResult<HealthResponse> {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
