//! Ship status state machine.
//!
//! The status is a tagged enum internally. Queued states carry a
//! [`QueueSlot`] instead of embedding the position in a string. The composed
//! label (`"AWAITING_REPAIRS (3)"`, `"AWAITING_TAKEOFF (Next)"`, `"OUTBOUND"`)
//! only exists at the `Display`/serde boundary, where external pollers rely
//! on the exact format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ModelError;

/// Label for ships waiting in the drydock queue.
pub const AWAITING_REPAIRS: &str = "AWAITING_REPAIRS";
/// Label for ships waiting in the launch queue.
pub const AWAITING_TAKEOFF: &str = "AWAITING_TAKEOFF";

/// Position of a ship inside a scheduler queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueSlot {
    /// Dequeued and about to become the active ship.
    Next,
    /// 1-based position counted from the head of the queue.
    Position(usize),
}

impl fmt::Display for QueueSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueSlot::Next => write!(f, "Next"),
            QueueSlot::Position(n) => write!(f, "{}", n),
        }
    }
}

/// Lifecycle state of a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipStatus {
    /// Idle on the surface and flightworthy.
    Ready,
    /// Idle on the surface, needs repairs.
    Broken,
    /// Destroyed on landing.
    Crashed,
    /// Handed off to the peer system.
    Active,
    /// Waiting in the drydock queue.
    AwaitingRepairs(QueueSlot),
    /// Currently being repaired.
    RepairInProgress,
    /// Waiting in the launch queue.
    AwaitingTakeoff(QueueSlot),
    /// Currently lifting off.
    TakingOff,
    /// Travelling away from the surface.
    Outbound,
    /// Travelling back to the surface.
    Inbound,
    /// Final descent.
    Landing,
}

impl ShipStatus {
    /// Resolves the outcome of a landing from the ship's condition.
    ///
    /// - `condition == 0` crashes
    /// - below a tenth of peak (whole-number division) comes down broken
    /// - anything else lands ready
    pub fn landing_outcome(condition: u32, peak_condition: u32) -> ShipStatus {
        if condition == 0 {
            ShipStatus::Crashed
        } else if condition < peak_condition / 10 {
            ShipStatus::Broken
        } else {
            ShipStatus::Ready
        }
    }
}

impl fmt::Display for ShipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShipStatus::Ready => write!(f, "READY"),
            ShipStatus::Broken => write!(f, "BROKEN"),
            ShipStatus::Crashed => write!(f, "CRASHED"),
            ShipStatus::Active => write!(f, "ACTIVE"),
            ShipStatus::AwaitingRepairs(slot) => write!(f, "{} ({})", AWAITING_REPAIRS, slot),
            ShipStatus::RepairInProgress => write!(f, "REPAIR_IN_PROGRESS"),
            ShipStatus::AwaitingTakeoff(slot) => write!(f, "{} ({})", AWAITING_TAKEOFF, slot),
            ShipStatus::TakingOff => write!(f, "TAKING_OFF"),
            ShipStatus::Outbound => write!(f, "OUTBOUND"),
            ShipStatus::Inbound => write!(f, "INBOUND"),
            ShipStatus::Landing => write!(f, "LANDING"),
        }
    }
}

impl FromStr for ShipStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if let Some((phase, rest)) = label.split_once(' ') {
            let slot = parse_slot(rest).ok_or_else(|| ModelError::UnknownStatus(s.to_string()))?;
            return match phase {
                AWAITING_REPAIRS => Ok(ShipStatus::AwaitingRepairs(slot)),
                AWAITING_TAKEOFF => Ok(ShipStatus::AwaitingTakeoff(slot)),
                _ => Err(ModelError::UnknownStatus(s.to_string())),
            };
        }

        match label {
            "READY" => Ok(ShipStatus::Ready),
            "BROKEN" => Ok(ShipStatus::Broken),
            "CRASHED" => Ok(ShipStatus::Crashed),
            "ACTIVE" => Ok(ShipStatus::Active),
            "REPAIR_IN_PROGRESS" => Ok(ShipStatus::RepairInProgress),
            "TAKING_OFF" => Ok(ShipStatus::TakingOff),
            "OUTBOUND" => Ok(ShipStatus::Outbound),
            "INBOUND" => Ok(ShipStatus::Inbound),
            "LANDING" => Ok(ShipStatus::Landing),
            _ => Err(ModelError::UnknownStatus(s.to_string())),
        }
    }
}

fn parse_slot(s: &str) -> Option<QueueSlot> {
    let inner = s.strip_prefix('(')?.strip_suffix(')')?;
    if inner == "Next" {
        return Some(QueueSlot::Next);
    }
    inner
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .map(QueueSlot::Position)
}

impl Serialize for ShipStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ShipStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}
