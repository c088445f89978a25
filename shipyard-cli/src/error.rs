//! CLI error types.

use std::fmt;

use shipyard::logging::LoggingError;
use shipyard::{AppError, ConfigError};

/// Errors surfaced to the user by the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Invalid command-line arguments or settings.
    Config(String),

    /// The configuration file could not be loaded.
    ConfigFile(ConfigError),

    /// Logging could not be installed.
    Logging(LoggingError),

    /// The simulation failed to start or stopped with an error.
    Simulation(AppError),

    /// The async runtime could not be created.
    Runtime(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "Failed to load configuration: {}", e),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Simulation(e) => write!(f, "{}", e),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Simulation(e) => Some(e),
            CliError::Config(_) | CliError::Runtime(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::Simulation(e)
    }
}
