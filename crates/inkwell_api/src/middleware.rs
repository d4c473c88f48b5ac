//! Request context and logging middleware.
//!
//! Every request passes through [`auth_middleware`], which inserts two
//! extensions for handlers:
//! - `Option<AuthUser>`: the session owner for a valid `Authorization: Bearer`
//!   token, `None` for anonymous callers or unusable tokens.
//! - [`ClientIp`]: first `X-Forwarded-For` entry, else the socket peer.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use inkwell_core::model::user::User;
use log::{debug, info};

use crate::error::{AppError, Result};
use crate::state::SharedState;

#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Unwraps the optional session user or fails with 401.
pub fn require_user(auth: Option<AuthUser>) -> Result<User> {
    auth.map(|AuthUser(user)| user)
        .ok_or_else(|| AppError::Unauthorized("authentication required".into()))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub fn client_ip(request: &Request) -> Option<String> {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

pub async fn auth_middleware(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    let user = match bearer_token(request.headers()) {
        Some(token) => match state.with_conn(|conn| state.auth(conn).authenticate(&token)) {
            Ok(user) => Some(AuthUser(user)),
            Err(err) => {
                debug!("event=auth_token module=api status=ignored reason={err}");
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(ClientIp(ip));
    next.run(request).await
}

/// One `event=http_request` line per request.
pub async fn request_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "event=http_request module=api method={} path={} status={} duration_ms={}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc-123".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc-123"));

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer   ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn client_ip_prefers_first_forwarded_entry() {
        let request = Request::builder()
            .header("X-Forwarded-For", " 203.0.113.7 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn client_ip_falls_back_to_peer_address() {
        let addr: SocketAddr = "192.168.1.100:12345".parse().unwrap();
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_ip(&request).as_deref(), Some("192.168.1.100"));

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&bare), None);
    }
}
