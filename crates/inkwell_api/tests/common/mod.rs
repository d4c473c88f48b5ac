#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use inkwell_api::{create_router, AppState, Config, SharedState};
use inkwell_core::model::user::{UserId, UserRole};
use inkwell_core::open_db_in_memory;
use inkwell_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery";
pub const BASE_URL: &str = "https://ink.example";
/// Lowest cost bcrypt accepts.
pub const TEST_BCRYPT_COST: u32 = 4;

pub struct TestApp {
    pub router: Router,
    pub state: SharedState,
    _upload_dir: TempDir,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Sends a request whose response is not JSON; returns content type and raw body.
    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, String, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, bytes)
    }

    /// Registers a user and returns `(token, id)`.
    pub async fn register(&self, username: &str) -> (String, UserId) {
        let (status, body) = self
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_i64().unwrap(),
        )
    }

    pub fn set_role(&self, user_id: UserId, role: UserRole) {
        self.state
            .with_conn(|conn| Ok(SqliteUserRepository::new(conn).set_role(user_id, role)?))
            .unwrap();
    }

    /// Creates and publishes an article; returns its id and slug.
    pub async fn publish_article(&self, token: &str, title: &str, content: &str) -> (i64, String) {
        let (status, body) = self
            .send(json_request(
                Method::POST,
                "/api/articles",
                Some(token),
                json!({ "title": title, "content": content, "tags": ["rust"] }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = self
            .send(empty_request(
                Method::POST,
                &format!("/api/articles/{id}/publish"),
                Some(token),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (id, body["data"]["slug"].as_str().unwrap().to_string())
    }
}

pub fn test_app() -> TestApp {
    let upload_dir = TempDir::new().unwrap();
    let upload_path = upload_dir.path().to_string_lossy().to_string();
    let mut config = Config::from_lookup(|key| match key {
        "INKWELL_BASE_URL" => Some(BASE_URL.to_string()),
        "INKWELL_UPLOAD_DIR" => Some(upload_path.clone()),
        "INKWELL_MAX_UPLOAD_BYTES" => Some("1024".to_string()),
        _ => None,
    })
    .unwrap();
    config.bcrypt_cost = TEST_BCRYPT_COST;

    let state = AppState::new(config, open_db_in_memory().unwrap()).shared();
    TestApp {
        router: create_router(state.clone()),
        state,
        _upload_dir: upload_dir,
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    empty_request(Method::GET, uri, token)
}
