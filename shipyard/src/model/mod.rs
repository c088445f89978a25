//! Ship, mission, log and event entities.
//!
//! These are plain data shared by every component of the simulation. The
//! engine only appends logs and events; it never edits or removes them.

mod log;
mod mission;
mod ship;
mod status;

pub use log::{Event, Log};
pub use mission::{Coordinates, Mission, MissionId, Objective};
pub use ship::{Ship, ShipId, MAX_PEAK_CONDITION};
pub use status::{QueueSlot, ShipStatus, AWAITING_REPAIRS, AWAITING_TAKEOFF};

use thiserror::Error;

/// Errors raised while building or parsing entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Peak condition above the hard cap.
    #[error("Peak condition {peak} exceeds maximum of {max}")]
    PeakTooHigh { peak: u32, max: u32 },

    /// Condition above the ship's own peak.
    #[error("Condition {condition} exceeds peak condition {peak}")]
    ConditionAbovePeak { condition: u32, peak: u32 },

    /// Status label that does not match any known phase.
    #[error("Unknown ship status: {0}")]
    UnknownStatus(String),
}
