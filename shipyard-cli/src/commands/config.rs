//! Config command - show the effective configuration.

use std::path::Path;

use shipyard::config::default_config_path;

use super::common::{load_config, resolve_config_path};
use crate::error::CliError;

/// Run the config command.
pub fn run(explicit: Option<&Path>, path_only: bool) -> Result<(), CliError> {
    if path_only {
        match default_config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("(no user configuration directory)"),
        }
        return Ok(());
    }

    let config = load_config(explicit)?;
    match resolve_config_path(explicit) {
        Some(path) => println!("; Loaded from {}", path.display()),
        None => println!("; Built-in defaults"),
    }
    print!("{}", config.to_ini_string());
    Ok(())
}
