//! Server configuration loaded from environment variables.

use crate::error::{AppError, Result};
use inkwell_core::logging::normalize_level;
use inkwell_core::service::auth_service::BCRYPT_COST;
use inkwell_core::service::upload_service::DEFAULT_MAX_UPLOAD_BYTES;
use log::info;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "inkwell.sqlite3";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Server bind address (host:port)
    pub bind_address: SocketAddr,

    /// Directory holding uploaded images
    pub upload_dir: PathBuf,

    /// Public origin used for canonical URLs and the sitemap
    pub base_url: String,

    pub log_level: String,

    /// Rotating log files go here; stderr when unset
    pub log_dir: Option<PathBuf>,

    pub max_upload_bytes: usize,

    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str, default: &str| -> String {
            match lookup(key).filter(|value| !value.trim().is_empty()) {
                Some(value) => value.trim().to_string(),
                None => {
                    info!("event=config_default module=config key={key} value={default}");
                    default.to_string()
                }
            }
        };

        let bind_address = read("INKWELL_BIND", DEFAULT_BIND)
            .parse::<SocketAddr>()
            .map_err(|err| AppError::Config(format!("INKWELL_BIND: {err}")))?;
        let log_level = normalize_level(&read("INKWELL_LOG_LEVEL", inkwell_core::default_log_level()))
            .map_err(|err| AppError::Config(format!("INKWELL_LOG_LEVEL: {err}")))?
            .to_string();
        let max_upload_bytes = read("INKWELL_MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse::<usize>()
            .ok()
            .filter(|bytes| *bytes > 0)
            .ok_or_else(|| {
                AppError::Config("INKWELL_MAX_UPLOAD_BYTES must be a positive integer".into())
            })?;
        let base_url = read("INKWELL_BASE_URL", DEFAULT_BASE_URL);
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::Config(
                "INKWELL_BASE_URL must start with http:// or https://".into(),
            ));
        }

        Ok(Self {
            db_path: PathBuf::from(read("INKWELL_DB_PATH", DEFAULT_DB_PATH)),
            bind_address,
            upload_dir: PathBuf::from(read("INKWELL_UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            base_url: base_url.trim_end_matches('/').to_string(),
            log_level,
            log_dir: lookup("INKWELL_LOG_DIR")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            max_upload_bytes,
            bcrypt_cost: BCRYPT_COST,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.bind_address.to_string(), DEFAULT_BIND);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn values_are_parsed_and_normalized() {
        let config = config_from(&[
            ("INKWELL_BIND", "0.0.0.0:9000"),
            ("INKWELL_BASE_URL", "https://ink.example/"),
            ("INKWELL_LOG_LEVEL", "WARNING"),
            ("INKWELL_MAX_UPLOAD_BYTES", "1024"),
            ("INKWELL_LOG_DIR", "/var/log/inkwell"),
        ])
        .unwrap();
        assert_eq!(config.bind_address.port(), 9000);
        assert_eq!(config.base_url, "https://ink.example");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/inkwell")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("INKWELL_BIND", "nowhere")]).is_err());
        assert!(config_from(&[("INKWELL_LOG_LEVEL", "loud")]).is_err());
        assert!(config_from(&[("INKWELL_MAX_UPLOAD_BYTES", "0")]).is_err());
        assert!(config_from(&[("INKWELL_BASE_URL", "ink.example")]).is_err());
    }
}
