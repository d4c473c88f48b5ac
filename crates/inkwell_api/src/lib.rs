//! HTTP API for the Inkwell publishing platform.
//!
//! Handlers are thin: they authenticate, extract input, call one
//! `inkwell_core` service and wrap the result in the
//! `{success, data, message}` envelope.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use inkwell_core::open_db;
use log::info;

pub use config::Config;
pub use error::{AppError, Result};
pub use routes::create_router;
pub use state::{AppState, SharedState};

/// Opens the database, binds the listener and serves until the process stops.
pub async fn serve(config: Config) -> Result<()> {
    let conn = open_db(&config.db_path)?;
    std::fs::create_dir_all(&config.upload_dir)?;
    let bind_address = config.bind_address;
    let state = AppState::new(config, conn).shared();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("event=server_start module=api status=ok bind={bind_address}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
