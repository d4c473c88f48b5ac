//! Process-wide logger setup.
//!
//! # Responsibility
//! - Start flexi_logger once, writing to stderr or to size-rotated files.
//! - Record panics as a single `event=panic_captured` line.
//!
//! # Invariants
//! - A second init with the same level and sink is a no-op.
//! - A second init with a different level or sink is an error, never a panic.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Once;

const FILE_BASENAME: &str = "inkwell";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

/// Log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Directory(PathBuf),
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stderr => f.write_str("stderr"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Normalized level plus sink; what the running logger was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSetup {
    pub level: &'static str,
    pub target: LogTarget,
}

impl fmt::Display for LogSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.level, self.target)
    }
}

struct ActiveLogger {
    setup: LogSetup,
    _handle: LoggerHandle,
}

/// Starts rolling file logs under `log_dir`, which must be absolute.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let setup = LogSetup {
        level: normalize_level(level)?,
        target: LogTarget::Directory(absolute_dir(log_dir)?),
    };
    activate(setup)
}

/// Starts stderr logging.
pub fn init_console_logging(level: &str) -> Result<(), String> {
    let setup = LogSetup {
        level: normalize_level(level)?,
        target: LogTarget::Stderr,
    };
    activate(setup)
}

/// The running logger's setup, if any.
pub fn logging_status() -> Option<LogSetup> {
    ACTIVE.get().map(|active| active.setup.clone())
}

/// `debug` in debug builds, `info` in release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Lowercases a level name; `warning` maps to `warn`.
pub fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn activate(setup: LogSetup) -> Result<(), String> {
    let active = ACTIVE.get_or_try_init(|| {
        let handle = start(&setup)?;
        PANIC_HOOK.call_once(install_panic_hook);
        info!(
            "event=logging_init module=core status=ok setup={} os={} version={}",
            setup,
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        );
        Ok::<_, String>(ActiveLogger {
            setup: setup.clone(),
            _handle: handle,
        })
    })?;

    if active.setup == setup {
        Ok(())
    } else {
        Err(format!(
            "logging already running as `{}`; refusing to switch to `{}`",
            active.setup, setup
        ))
    }
}

fn start(setup: &LogSetup) -> Result<LoggerHandle, String> {
    let logger = Logger::try_with_str(setup.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", setup.level))?;

    let started = match &setup.target {
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format)
            .start(),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|err| format!("cannot create log dir `{}`: {err}", dir.display()))?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
        }
    };
    started.map_err(|err| format!("failed to start logger: {err}"))
}

fn absolute_dir(log_dir: &str) -> Result<PathBuf, String> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log directory cannot be empty".to_string());
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Err(format!("log directory must be absolute, got `{trimmed}`"))
    }
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location,
            single_line(&payload, PANIC_SUMMARY_CHARS)
        );
        previous(info);
    }));
}

/// Flattens newlines and caps length so a value fits one log field.
pub fn single_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn level_names_are_normalized() {
        assert_eq!(normalize_level("INFO").unwrap(), "info");
        assert_eq!(normalize_level(" warning ").unwrap(), "warn");
        assert!(normalize_level("loud").is_err());
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let err = absolute_dir("logs/dev").unwrap_err();
        assert!(err.contains("absolute"));
        assert!(absolute_dir("   ").is_err());
    }

    #[test]
    fn single_line_flattens_and_truncates() {
        let flat = single_line("line1\nline2\rline3", 8);
        assert!(!flat.contains('\n'));
        assert!(!flat.contains('\r'));
        assert!(flat.ends_with("..."));
        assert_eq!(single_line("short", 8), "short");
    }

    #[test]
    fn reinit_is_idempotent_and_conflicts_are_rejected() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let dir_str = dir.path().to_str().unwrap();

        init_logging("info", dir_str).unwrap();
        init_logging("INFO", dir_str).unwrap();

        assert!(init_logging("debug", dir_str)
            .unwrap_err()
            .contains("refusing to switch"));
        assert!(init_logging("info", other.path().to_str().unwrap())
            .unwrap_err()
            .contains("refusing to switch"));
        assert!(init_console_logging("info")
            .unwrap_err()
            .contains("refusing to switch"));

        let active = logging_status().unwrap();
        assert_eq!(active.level, "info");
        assert_eq!(active.target, LogTarget::Directory(dir.path().to_path_buf()));
    }
}
