//! Registration, login and session handlers.

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use inkwell_core::model::user::User;
use inkwell_core::service::auth_service::{AuthSession, LoginInput, RegisterInput};
use serde::Deserialize;

use crate::error::AppError;
use crate::extract::JsonBody;
use crate::middleware::{bearer_token, require_user, AuthUser, ClientIp};
use crate::response::{created, done, ok, ApiResult, Created};
use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

async fn register(
    State(state): State<SharedState>,
    Extension(ip): Extension<ClientIp>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> Created<AuthSession> {
    let session = state.with_conn(|conn| state.auth(conn).register(&input, ip.as_deref()))?;
    created(session)
}

async fn login(
    State(state): State<SharedState>,
    Extension(ip): Extension<ClientIp>,
    JsonBody(input): JsonBody<LoginInput>,
) -> ApiResult<AuthSession> {
    ok(state.with_conn(|conn| state.auth(conn).login(&input, ip.as_deref()))?)
}

async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult<()> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
    state.with_conn(|conn| state.auth(conn).logout(&token))?;
    done("logged out")
}

async fn me(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
) -> ApiResult<User> {
    let user = require_user(auth)?;
    ok(state.with_conn(|conn| state.auth(conn).me(user.id))?)
}

async fn change_password(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthUser>>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> ApiResult<()> {
    let user = require_user(auth)?;
    let keep = bearer_token(&headers);
    state.with_conn(|conn| {
        state.auth(conn).change_password(
            user.id,
            &body.current_password,
            &body.new_password,
            keep.as_deref(),
        )
    })?;
    done("password changed")
}
