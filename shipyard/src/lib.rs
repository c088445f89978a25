//! Shipyard - ship lifecycle simulation
//!
//! This library simulates a fleet of ships moving between a drydock, a
//! launch site and a peer system. Ships are repaired one at a time, launched
//! one at a time, and then travel on their own until they are handed off to
//! the peer system or land back on the surface.
//!
//! Persistence is left to the caller through the [`ShipStore`] trait and the
//! peer system is reached through the [`PeerClient`] trait. [`Shipyard`]
//! wires both to the schedulers and owns their lifetime.

pub mod app;
pub mod config;
pub mod flavor;
pub mod logging;
pub mod model;
pub mod peer;
pub mod sim;
pub mod store;
pub mod telemetry;

pub use app::{AppError, Shipyard};
pub use config::{ConfigError, FlavorRates, PeerConfig, ShipyardConfig, SimulationConfig};
pub use flavor::{FlavorCategory, FlavorText};
pub use model::{Mission, MissionId, Objective, Ship, ShipId, ShipStatus};
pub use peer::{PeerClient, PeerError, ReqwestPeerClient};
pub use sim::{SchedulerError, SimContext, TransitOutcome};
pub use store::{MemoryStore, ShipStore, StoreError};
pub use telemetry::{MetricsSnapshot, SimulationMetrics};
