//! Common utilities shared across CLI commands.

use std::path::{Path, PathBuf};

use shipyard::config::default_config_path;
use shipyard::ShipyardConfig;

use crate::error::CliError;

/// Resolve which configuration file to read, if any.
///
/// An explicit path always wins. Otherwise the default path is used when
/// the file exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    }
}

/// Load configuration, falling back to defaults when no file is present.
pub fn load_config(explicit: Option<&Path>) -> Result<ShipyardConfig, CliError> {
    match resolve_config_path(explicit) {
        Some(path) => Ok(ShipyardConfig::from_ini_file(&path)?),
        None => Ok(ShipyardConfig::default()),
    }
}
