//! Application error types.

use std::fmt;

use crate::config::ConfigError;
use crate::peer::PeerError;
use crate::sim::{SchedulerError, TransitError};

/// Errors from starting or driving a [`Shipyard`](super::Shipyard).
#[derive(Debug)]
pub enum AppError {
    /// Configuration failed validation.
    Config(ConfigError),

    /// The peer HTTP client could not be built.
    Peer(PeerError),

    /// A scheduler refused the ship.
    Scheduler(SchedulerError),

    /// The ship already has a live transit.
    Transit(TransitError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Peer(e) => write!(f, "Failed to create peer client: {}", e),
            AppError::Scheduler(e) => write!(f, "Scheduling failed: {}", e),
            AppError::Transit(e) => write!(f, "Transit failed: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Peer(e) => Some(e),
            AppError::Scheduler(e) => Some(e),
            AppError::Transit(e) => Some(e),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<PeerError> for AppError {
    fn from(e: PeerError) -> Self {
        AppError::Peer(e)
    }
}

impl From<SchedulerError> for AppError {
    fn from(e: SchedulerError) -> Self {
        AppError::Scheduler(e)
    }
}

impl From<TransitError> for AppError {
    fn from(e: TransitError) -> Self {
        AppError::Transit(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShipId;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Scheduler(SchedulerError::AlreadyQueued(ShipId(3)));
        assert!(err.to_string().contains("Scheduling failed"));
        assert!(err.to_string().contains("Ship 3"));
    }

    #[test]
    fn test_app_error_from_transit_error() {
        let app_err: AppError = TransitError::AlreadyInFlight(ShipId(1)).into();
        assert!(matches!(app_err, AppError::Transit(_)));
    }
}
