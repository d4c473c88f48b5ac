//! Publication and membership handlers.

use axum::{
    extract::{Extension, State},
    routing::{get, put},
    Router,
};
use inkwell_core::model::article::Article;
use inkwell_core::model::publication::{
    MemberRole, Publication, PublicationId, PublicationInput, PublicationMember,
};
use inkwell_core::model::user::UserId;
use inkwell_core::repo::Page;
use inkwell_core::service::publication_service::PublicationService;
use serde::Deserialize;

use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::middleware::{require_user, AuthUser};
use crate::response::{created, done, ok, ApiResult, Created};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(delete_one))
        .route("/:id/articles", get(articles))
        .route("/:id/members", get(members).post(add_member))
        .route("/:id/members/:user_id", put(change_role).delete(remove_member))
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: UserId,
    pub role: MemberRole,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: MemberRole,
}

async fn list(
    State(state): State<SharedState>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<Publication>> {
    ok(state.with_conn(|conn| PublicationService::new(conn).list(page))?)
}

async fn create(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    JsonBody(input): JsonBody<PublicationInput>,
) -> Created<Publication> {
    let user = require_user(auth)?;
    created(state.with_conn(|conn| PublicationService::new(conn).create(&user, &input))?)
}

async fn get_one(
    State(state): State<SharedState>,
    PathParam(id): PathParam<PublicationId>,
) -> ApiResult<Publication> {
    ok(state.with_conn(|conn| PublicationService::new(conn).get(id))?)
}

async fn update(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<PublicationId>,
    JsonBody(input): JsonBody<PublicationInput>,
) -> ApiResult<Publication> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| PublicationService::new(conn).update(&user, id, &input))?)
}

async fn delete_one(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<PublicationId>,
) -> ApiResult<()> {
    let user = require_user(auth)?;
    state.with_conn(|conn| PublicationService::new(conn).delete(&user, id))?;
    done("publication deleted")
}

async fn articles(
    State(state): State<SharedState>,
    PathParam(id): PathParam<PublicationId>,
    QueryParams(page): QueryParams<Page>,
) -> ApiResult<Vec<Article>> {
    ok(state.with_conn(|conn| PublicationService::new(conn).articles(id, page))?)
}

async fn members(
    State(state): State<SharedState>,
    PathParam(id): PathParam<PublicationId>,
) -> ApiResult<Vec<PublicationMember>> {
    ok(state.with_conn(|conn| PublicationService::new(conn).members(id))?)
}

async fn add_member(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam(id): PathParam<PublicationId>,
    JsonBody(body): JsonBody<AddMemberRequest>,
) -> ApiResult<Vec<PublicationMember>> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| {
        PublicationService::new(conn).add_member(&user, id, body.user_id, body.role)
    })?)
}

async fn change_role(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam((id, user_id)): PathParam<(PublicationId, UserId)>,
    JsonBody(body): JsonBody<ChangeRoleRequest>,
) -> ApiResult<Vec<PublicationMember>> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| {
        PublicationService::new(conn).change_role(&user, id, user_id, body.role)
    })?)
}

async fn remove_member(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    PathParam((id, user_id)): PathParam<(PublicationId, UserId)>,
) -> ApiResult<()> {
    let user = require_user(auth)?;
    state.with_conn(|conn| PublicationService::new(conn).remove_member(&user, id, user_id))?;
    done("member removed")
}
