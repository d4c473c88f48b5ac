//! Router assembly.

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};

use crate::handlers;
use crate::middleware::{auth_middleware, request_log_middleware};
use crate::state::SharedState;

/// JSON bodies larger than this are refused.
const JSON_BODY_LIMIT: usize = 1024 * 1024;
/// Room for multipart boundaries and headers on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: SharedState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .nest("/api", api_routes(upload_limit))
        .route("/uploads/:file", get(handlers::uploads::serve))
        .route("/sitemap.xml", get(handlers::seo::sitemap))
        .route("/robots.txt", get(handlers::seo::robots))
        .fallback(handlers::health::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn(request_log_middleware))
        .with_state(state)
}

fn api_routes(upload_limit: usize) -> Router<SharedState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/auth", handlers::auth::router())
        .nest("/users", handlers::users::router())
        .nest("/follows", handlers::follows::router())
        .nest("/articles", handlers::articles::router())
        .nest("/search", handlers::search::router())
        .nest("/feed", handlers::feed::router())
        .nest("/tags", handlers::tags::router())
        .nest("/claps", handlers::claps::router())
        .nest("/comments", handlers::comments::router())
        .nest("/bookmarks", handlers::bookmarks::router())
        .nest("/notifications", handlers::notifications::router())
        .nest("/publications", handlers::publications::router())
        .nest("/workflow", handlers::workflow::router())
        .nest("/moderation", handlers::moderation::router())
        .nest("/security", handlers::security::router())
        .nest("/admin", handlers::admin::router())
        .nest("/analytics", handlers::analytics::router())
        .nest("/dashboard", handlers::dashboard::router())
        .nest("/seo", handlers::seo::router())
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .nest(
            "/upload",
            handlers::uploads::router().layer(DefaultBodyLimit::max(upload_limit)),
        )
}
