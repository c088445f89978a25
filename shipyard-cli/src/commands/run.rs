//! Run command - drive a demo fleet through the simulation.
//!
//! The fleet lives in a `MemoryStore`. A dispatcher looks at the store on
//! every board refresh and keeps ships moving: broken or worn ships go to the
//! drydock, healthy idle ships get a mission and go to the launch site, and
//! ships that reached the peer system are eventually received back.

use std::sync::Arc;
use std::time::Duration;

use console::{style, StyledObject};
use rand::seq::IndexedRandom;
use rand::Rng;
use shipyard::logging::init_logging;
use shipyard::model::{Coordinates, Mission, MissionId, Objective, Ship, ShipId, ShipStatus};
use shipyard::{
    AppError, MemoryStore, MetricsSnapshot, Shipyard, ShipyardConfig, TransitOutcome,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CliError;

const SHIP_NAMES: &[&str] = &[
    "Albatross",
    "Cormorant",
    "Gannet",
    "Heron",
    "Kestrel",
    "Petrel",
    "Shearwater",
    "Skua",
    "Tern",
    "Wren",
];

const MISSION_TITLES: &[&str] = &[
    "Belt survey",
    "Relay drop",
    "Derelict search",
    "Ring mapping",
    "Beacon repair",
];

const OBJECTIVES: &[Objective] = &[
    Objective::Explore,
    Objective::Survey,
    Objective::Deliver,
    Objective::Rescue,
];

/// Chance per refresh that an active ship is sent home.
const RECALL_CHANCE: f64 = 0.25;

/// Chance per refresh that an outbound ship is told to turn back.
const ABORT_CHANCE: f64 = 0.02;

/// Arguments for the run command.
pub struct RunArgs {
    pub ships: usize,
    pub peer_url: Option<String>,
    pub time_scale: Option<f64>,
    pub board_interval: u64,
}

/// Run the simulation until Ctrl+C.
pub fn run(mut config: ShipyardConfig, args: RunArgs) -> Result<(), CliError> {
    if let Some(url) = args.peer_url {
        config.peer.base_url = url;
    }
    if let Some(scale) = args.time_scale {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(CliError::Config(format!(
                "time scale must be a positive number, got {}",
                scale
            )));
        }
        config.simulation = config.simulation.scaled(scale);
    }
    if args.ships == 0 {
        return Err(CliError::Config("the fleet needs at least one ship".to_string()));
    }

    let _log_guard = init_logging(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    runtime.block_on(simulate(config, args.ships, args.board_interval))
}

async fn simulate(
    config: ShipyardConfig,
    fleet_size: usize,
    board_interval: u64,
) -> Result<(), CliError> {
    let store = Arc::new(MemoryStore::new());
    let yard = Shipyard::start(&config, store.clone())?;

    for ship in demo_fleet(fleet_size) {
        store.insert(ship);
    }

    println!("Shipyard v{}", env!("CARGO_PKG_VERSION"));
    println!("================");
    println!();
    println!("Fleet:      {} ships", fleet_size);
    println!("Peer:       {}", config.peer.ships_url());
    println!("Idle tick:  {:?}", config.simulation.idle_interval);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stop = CancellationToken::new();
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        stop_handler.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let mut dispatcher = Dispatcher::new(fleet_size as u64);
    let mut ticker = tokio::time::interval(Duration::from_secs(board_interval.max(1)));

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                dispatcher.dispatch(&yard, &store);
                print_board(&store.ships(), &yard.metrics());
            }
        }
    }

    let outcomes = yard.shutdown().await.map_err(AppError::from)?;

    let cut_short = outcomes
        .iter()
        .filter(|o| **o == TransitOutcome::Interrupted)
        .count();
    let summary = store_summary(&store);
    println!();
    println!("Session Summary");
    println!("───────────────");
    println!("  Ships ready:    {}", summary.ready);
    println!("  Ships active:   {}", summary.active);
    println!("  Ships broken:   {}", summary.broken);
    println!("  Ships crashed:  {}", summary.crashed);
    println!("  Flights cut:    {}", cut_short);
    Ok(())
}

// =============================================================================
// Fleet
// =============================================================================

/// Builds the demo fleet. Roughly a third of the ships start worn.
fn demo_fleet(size: usize) -> Vec<Ship> {
    let mut rng = rand::rng();
    (0..size)
        .filter_map(|i| {
            let base = SHIP_NAMES[i % SHIP_NAMES.len()];
            let name = match i / SHIP_NAMES.len() {
                0 => base.to_string(),
                n => format!("{} {}", base, n + 1),
            };
            let peak = rng.random_range(20..=120);
            let condition = if i % 3 == 2 {
                rng.random_range(0..=peak / 4)
            } else {
                rng.random_range(peak / 2..=peak)
            };
            Ship::new(ShipId(i as u64 + 1), name, condition, peak)
                .ok()
                .map(|ship| ship.with_description("Demo fleet"))
        })
        .collect()
}

struct Dispatcher {
    next_mission: u64,
}

impl Dispatcher {
    fn new(first_mission: u64) -> Self {
        Self {
            next_mission: first_mission,
        }
    }

    fn mission(&mut self) -> Mission {
        let mut rng = rand::rng();
        self.next_mission += 1;
        let objective = OBJECTIVES.choose(&mut rng).copied().unwrap_or(Objective::Explore);
        let title = MISSION_TITLES.choose(&mut rng).copied().unwrap_or("Patrol");
        let center = Coordinates::new(
            rng.random_range(-500.0..500.0),
            rng.random_range(-500.0..500.0),
            rng.random_range(-50.0..50.0),
        );
        Mission::new(MissionId(self.next_mission), objective, title)
            .with_volume(center, rng.random_range(5.0..80.0))
    }

    /// Moves idle ships along. Refusals only mean the ship is busy.
    fn dispatch(&mut self, yard: &Shipyard, store: &MemoryStore) {
        for ship in store.ships() {
            let id = ship.id;
            let result = match ship.status {
                ShipStatus::Broken => yard.repair(ship).map(drop).map_err(AppError::from),
                ShipStatus::Ready if ship.condition() * 2 < ship.peak_condition() => {
                    yard.repair(ship).map(drop).map_err(AppError::from)
                }
                ShipStatus::Ready => {
                    let mission = self.mission();
                    yard.launch(ship.with_mission(mission))
                        .map(drop)
                        .map_err(AppError::from)
                }
                ShipStatus::Active if rand::rng().random_bool(RECALL_CHANCE) => yard.receive(ship),
                ShipStatus::Outbound if rand::rng().random_bool(ABORT_CHANCE) => {
                    yard.abort_mission(id);
                    Ok(())
                }
                _ => Ok(()),
            };
            if let Err(e) = result {
                debug!(ship_id = %id, error = %e, "Ship not dispatched");
            }
        }
    }
}

// =============================================================================
// Status board
// =============================================================================

fn styled_status(status: ShipStatus) -> StyledObject<String> {
    let label = format!("{:<24}", status.to_string());
    match status {
        ShipStatus::Ready | ShipStatus::Active => style(label).green(),
        ShipStatus::Broken => style(label).yellow(),
        ShipStatus::Crashed => style(label).red(),
        _ => style(label).cyan(),
    }
}

fn print_board(ships: &[Ship], metrics: &MetricsSnapshot) {
    println!("{}", style("Fleet").bold());
    for ship in ships {
        println!(
            "  {:>3}  {:<14} {} {:>3}/{:<3}  {} logs",
            ship.id,
            ship.name,
            styled_status(ship.status),
            ship.condition(),
            ship.peak_condition(),
            ship.logs.len()
        );
    }
    println!(
        "  {} repairs ({} cut short) | {} launches ({} aborted) | {} delivered | {} landed | {} store errors",
        metrics.repairs_completed,
        metrics.repairs_interrupted,
        metrics.launches,
        metrics.launch_aborts,
        metrics.deliveries_succeeded,
        metrics.landings(),
        metrics.persistence_failures
    );
    println!();
}

#[derive(Debug, Default, PartialEq)]
struct FleetSummary {
    ready: usize,
    active: usize,
    broken: usize,
    crashed: usize,
}

fn store_summary(store: &MemoryStore) -> FleetSummary {
    let mut summary = FleetSummary::default();
    for ship in store.ships() {
        match ship.status {
            ShipStatus::Ready => summary.ready += 1,
            ShipStatus::Active => summary.active += 1,
            ShipStatus::Broken => summary.broken += 1,
            ShipStatus::Crashed => summary.crashed += 1,
            _ => {}
        }
    }
    summary
}
