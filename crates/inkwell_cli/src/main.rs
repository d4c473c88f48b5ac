//! `inkwell` command line entry point.
//!
//! # Responsibility
//! - Start the HTTP server with environment config plus flag overrides.
//! - Run schema migrations and small operator tasks without the server.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use inkwell_api::{AppError, Config, Result};
use inkwell_core::db::migrations::{current_user_version, latest_version};
use inkwell_core::model::user::UserRole;
use inkwell_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use inkwell_core::ServiceError;
use log::info;

/// Inkwell publishing platform
#[derive(Parser, Debug)]
#[command(name = "inkwell", about = "Inkwell publishing platform", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address (overrides $INKWELL_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// SQLite database file (overrides $INKWELL_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Upload directory (overrides $INKWELL_UPLOAD_DIR)
        #[arg(long)]
        upload_dir: Option<PathBuf>,

        /// Log level (overrides $INKWELL_LOG_LEVEL)
        #[arg(long)]
        log_level: Option<String>,

        /// Absolute directory for rolling log files (overrides $INKWELL_LOG_DIR)
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Apply pending schema migrations and print the schema version
    Migrate {
        /// SQLite database file (overrides $INKWELL_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Change a user's platform role
    Promote {
        #[arg(long)]
        username: String,

        /// user, moderator or admin
        #[arg(long, value_parser = parse_role, default_value = "admin")]
        role: UserRole,

        /// SQLite database file (overrides $INKWELL_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Print the core version
    Version,
}

fn parse_role(value: &str) -> std::result::Result<UserRole, String> {
    UserRole::parse(&value.trim().to_ascii_lowercase())
        .ok_or_else(|| format!("unknown role `{value}`"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            db,
            upload_dir,
            log_level,
            log_dir,
        } => {
            let mut config = Config::from_env()?;
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            if let Some(db) = db {
                config.db_path = db;
            }
            if let Some(dir) = upload_dir {
                config.upload_dir = dir;
            }
            if let Some(level) = log_level {
                config.log_level = level;
            }
            if let Some(dir) = log_dir {
                config.log_dir = Some(dir);
            }
            init_logging(&config)?;
            inkwell_api::serve(config).await
        }
        Commands::Migrate { db } => {
            let path = db_path(db)?;
            let conn = inkwell_core::open_db(&path)?;
            println!(
                "schema version {} of {} at {}",
                current_user_version(&conn)?,
                latest_version(),
                path.display()
            );
            Ok(())
        }
        Commands::Promote { username, role, db } => {
            let conn = inkwell_core::open_db(db_path(db)?)?;
            let users = SqliteUserRepository::new(&conn);
            let user = users
                .find_by_username(username.trim())
                .map_err(ServiceError::from)?
                .ok_or_else(|| AppError::NotFound(format!("user `{username}`")))?;
            users.set_role(user.id, role).map_err(ServiceError::from)?;
            info!(
                "event=role_change module=cli status=ok user_id={} role={}",
                user.id,
                role.as_str()
            );
            println!("{} is now {}", user.username, role.as_str());
            Ok(())
        }
        Commands::Version => {
            println!("inkwell {}", inkwell_core::core_version());
            Ok(())
        }
    }
}

fn db_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path),
        None => Ok(Config::from_env()?.db_path),
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let outcome = match &config.log_dir {
        Some(dir) => inkwell_core::init_logging(&config.log_level, &dir.to_string_lossy()),
        None => inkwell_core::init_console_logging(&config.log_level),
    };
    outcome.map_err(AppError::Config)
}
