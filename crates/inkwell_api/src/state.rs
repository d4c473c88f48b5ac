//! Shared application state.

use crate::config::Config;
use crate::error::{AppError, Result};
use inkwell_core::service::auth_service::AuthService;
use inkwell_core::service::upload_service::UploadSettings;
use inkwell_core::ServiceResult;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub uploads: UploadSettings,
    db: Mutex<Connection>,
}

impl AppState {
    pub fn new(config: Config, conn: Connection) -> Self {
        let uploads =
            UploadSettings::new(config.upload_dir.clone()).with_max_bytes(config.max_upload_bytes);
        Self {
            config,
            uploads,
            db: Mutex::new(conn),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    /// Runs `op` against the connection. The lock is never held across an await.
    pub fn with_conn<T>(&self, op: impl FnOnce(&Connection) -> ServiceResult<T>) -> Result<T> {
        let conn = self
            .db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".into()))?;
        op(&conn).map_err(AppError::from)
    }

    pub fn auth<'conn>(&self, conn: &'conn Connection) -> AuthService<'conn> {
        AuthService::new(conn).with_bcrypt_cost(self.config.bcrypt_cost)
    }
}
