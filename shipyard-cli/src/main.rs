//! Shipyard CLI - headless runner for the ship-lifecycle simulation.
//!
//! `shipyard run` seeds a demo fleet into an in-memory store and keeps it
//! moving through the drydock, the launch site and transit until Ctrl+C.
//! `shipyard config` prints the effective configuration.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::run::RunArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "shipyard", version, about = "Ship lifecycle simulation", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the simulation with a demo fleet until Ctrl+C
    Run {
        /// Number of ships in the demo fleet
        #[arg(long, default_value_t = 6)]
        ships: usize,

        /// Base URL of the peer system receiving launched ships
        #[arg(long)]
        peer_url: Option<String>,

        /// Multiply every simulated duration, e.g. 0.1 runs ten times faster
        #[arg(long)]
        time_scale: Option<f64>,

        /// Seconds between status board refreshes
        #[arg(long, default_value_t = 5)]
        board_interval: u64,
    },

    /// Print the effective configuration as INI
    Config {
        /// Print only the default configuration file path
        #[arg(long)]
        path: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Run {
            ships,
            peer_url,
            time_scale,
            board_interval,
        } => commands::common::load_config(cli.config.as_deref()).and_then(|config| {
            commands::run::run(
                config,
                RunArgs {
                    ships,
                    peer_url,
                    time_scale,
                    board_interval,
                },
            )
        }),
        Commands::Config { path } => commands::config::run(cli.config.as_deref(), path),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
