//! Submission and editorial review handlers.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Router,
};
use inkwell_core::model::article::ArticleId;
use inkwell_core::model::publication::{PublicationId, Submission, SubmissionId};
use inkwell_core::service::workflow_service::WorkflowService;
use serde::Deserialize;

use crate::extract::{JsonBody, PathParam};
use crate::middleware::{require_user, AuthUser};
use crate::response::{created, ok, ApiResult, Created};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/submissions", post(submit))
        .route("/submissions/mine", get(my_submissions))
        .route("/submissions/:id", get(get_one))
        .route("/submissions/:id/approve", post(approve))
        .route("/submissions/:id/reject", post(reject))
        .route("/submissions/:id/revision", post(request_revision))
        .route("/publications/:id/queue", get(review_queue))
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub article_id: ArticleId,
    pub publication_id: PublicationId,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub feedback: Option<String>,
}

async fn submit(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    JsonBody(body): JsonBody<SubmitRequest>,
) -> Created<Submission> {
    let user = require_user(auth)?;
    created(state.with_conn(|conn| {
        WorkflowService::new(conn).submit(&user, body.article_id, body.publication_id)
    })?)
}

async fn my_submissions(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
) -> ApiResult<Vec<Submission>> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| WorkflowService::new(conn).my_submissions(&user))?)
}

async fn get_one(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<SubmissionId>,
) -> ApiResult<Submission> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| WorkflowService::new(conn).get(&user, id))?)
}

async fn review_queue(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(publication_id): PathParam<PublicationId>,
) -> ApiResult<Vec<Submission>> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| WorkflowService::new(conn).review_queue(&user, publication_id))?)
}

async fn approve(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<SubmissionId>,
    JsonBody(body): JsonBody<ReviewRequest>,
) -> ApiResult<Submission> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| {
        WorkflowService::new(conn).approve(&user, id, body.feedback.as_deref())
    })?)
}

async fn reject(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<SubmissionId>,
    JsonBody(body): JsonBody<ReviewRequest>,
) -> ApiResult<Submission> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| {
        WorkflowService::new(conn).reject(&user, id, body.feedback.as_deref())
    })?)
}

async fn request_revision(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<SubmissionId>,
    JsonBody(body): JsonBody<ReviewRequest>,
) -> ApiResult<Submission> {
    let user = require_user(auth)?;
    let feedback = body.feedback.unwrap_or_default();
    ok(state.with_conn(|conn| WorkflowService::new(conn).request_revision(&user, id, &feedback))?)
}
