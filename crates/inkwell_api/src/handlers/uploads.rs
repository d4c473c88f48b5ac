//! Image upload and file serving handlers.

use axum::{
    extract::{multipart::MultipartRejection, Extension, Multipart, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
    routing::{delete, get},
    Router,
};
use inkwell_core::model::upload::Upload;
use inkwell_core::repo::Page;
use inkwell_core::service::upload_service::UploadService;

use crate::error::{AppError, Result};
use crate::extract::{PathParam, QueryParams};
use crate::middleware::{require_user, AuthUser};
use crate::response::{created, done, ok, ApiResult, Created};
use crate::state::SharedState;

/// Multipart form field carrying the image.
pub const FILE_FIELD: &str = "file";

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(upload))
        .route("/:id", delete(delete_one))
}

async fn upload(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Created<Upload> {
    let user = require_user(auth)?;
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let declared = field.content_type().map(str::to_string);
        let original = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        let stored = state.with_conn(|conn| {
            UploadService::new(conn, &state.uploads).store(
                &user,
                &bytes,
                declared.as_deref(),
                original.as_deref(),
            )
        })?;
        return created(stored);
    }

    Err(AppError::Validation(format!(
        "multipart field `{FILE_FIELD}` is required"
    )))
}

async fn list(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<Upload>> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| UploadService::new(conn, &state.uploads).list(&user, page))?)
}

async fn delete_one(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<()> {
    let user = require_user(auth)?;
    state.with_conn(|conn| UploadService::new(conn, &state.uploads).delete(&user, id))?;
    done("upload deleted")
}

/// Serves `/uploads/{file}`; only stored-name shaped paths resolve.
pub async fn serve(
    State(state): State<SharedState>,
    PathParam(file): PathParam<String>,
) -> Result<impl IntoResponse> {
    let stored = state.with_conn(|conn| UploadService::new(conn, &state.uploads).open(&file))?;
    let bytes = tokio::fs::read(&stored.path).await?;
    Ok((
        [
            (CONTENT_TYPE, stored.kind.mime_type()),
            (CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        bytes,
    ))
}
