//! Tracing setup for the binary
//!
//! Human-readable output goes to stderr so stdout stays clean for command
//! results. A JSON file log is added when a log directory is configured.

use std::path::PathBuf;

use compact_str::CompactString;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::result::{AppError, Result};

pub const ENV_LOG_LEVEL: &str = "GH_CLIENT_LOG";
pub const ENV_LOG_DIR: &str = "GH_CLIENT_LOG_DIR";

const LOG_FILE_PREFIX: &str = "gh-client.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: CompactString,
    /// Directory for daily-rotated JSON logs
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), log_dir: None }
    }
}

impl LoggingConfig {
    /// Resolve from the process environment over `file_level`
    pub fn from_env(file_level: Option<&str>) -> Self {
        Self::from_lookup(file_level, |key| std::env::var(key).ok())
    }

    /// Precedence: `GH_CLIENT_LOG`, then `file_level`, then `info`
    pub fn from_lookup<F>(file_level: Option<&str>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = file_level.map(str::trim).filter(|l| !l.is_empty()) {
            config.level = level.into();
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL)
            && !level.trim().is_empty()
        {
            config.level = level.trim().into();
        }
        config.log_dir = lookup(ENV_LOG_DIR).filter(|d| !d.trim().is_empty()).map(PathBuf::from);
        config
    }

    pub fn with_level(mut self, level: impl Into<CompactString>) -> Self {
        self.level = level.into();
        self
    }
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop and must live as long as
/// the process logs.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.as_str())
            .map_err(|e| AppError::Logging(format!("invalid log level {:?}: {e}", config.level)))?,
    };

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                AppError::Logging(format!("cannot create log directory {}: {e}", dir.display()))
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;

    Ok(guard)
}
