//! `{success, data, message}` response envelope.

use crate::error::Result;
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>>;

pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>)>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        data: Some(data),
        message: None,
    }))
}

pub fn ok_message<T>(data: T, message: impl Into<String>) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        data: Some(data),
        message: Some(message.into()),
    }))
}

/// Success without a payload; `data` serializes as `null`.
pub fn done(message: impl Into<String>) -> ApiResult<()> {
    Ok(Json(ApiResponse {
        success: true,
        data: None,
        message: Some(message.into()),
    }))
}

pub fn created<T>(data: T) -> Created<T> {
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            message: None,
        }),
    ))
}
