//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events. Binaries call [`init_logging`]
//! once at startup and keep the returned [`LoggingGuard`] alive until exit
//! so buffered file output is flushed.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "shipyard=info";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `shipyard=debug`. `RUST_LOG` takes precedence.
    pub filter: String,

    /// Optional file receiving a copy of all log output.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            file: None,
        }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("Log file path has no file name: {0}")]
    FilePath(PathBuf),

    #[error("Failed to open log file {}: {reason}", path.display())]
    File { path: PathBuf, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Keeps the non-blocking file writer alive.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Installs the global tracing subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| LoggingError::Filter {
            filter: config.filter.clone(),
            reason: e.to_string(),
        })?,
    };

    let console = fmt::layer().with_target(false);

    match &config.file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| LoggingError::FilePath(path.clone()))?;
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name.to_string_lossy().into_owned())
                .build(&directory)
                .map_err(|e| LoggingError::File {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(writer);

            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file_layer)
                .try_init()
                .map_err(|e| LoggingError::Install(e.to_string()))?;

            Ok(LoggingGuard {
                _file_guard: Some(guard),
            })
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init()
                .map_err(|e| LoggingError::Install(e.to_string()))?;

            Ok(LoggingGuard { _file_guard: None })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let config = LoggingConfig::default();
        assert_eq!(config.filter, "shipyard=info");
        assert!(config.file.is_none());
    }

    #[test]
    fn test_file_path_without_name_is_rejected() {
        let config = LoggingConfig {
            filter: DEFAULT_LOG_FILTER.to_string(),
            file: Some(PathBuf::from("/")),
        };
        assert!(matches!(
            init_logging(&config),
            Err(LoggingError::FilePath(_))
        ));
    }
}
