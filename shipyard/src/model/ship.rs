//! The ship entity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Log, Mission, ModelError, ShipStatus};

/// Upper bound on a ship's peak condition.
pub const MAX_PEAK_CONDITION: u32 = 500;

/// Ship identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipId(pub u64);

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A spacecraft tracked by the simulation.
///
/// Ships move by value between the store, a scheduler and a transit worker,
/// so only the current holder can change them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ShipRecord")]
pub struct Ship {
    pub id: ShipId,
    pub name: String,
    pub status: ShipStatus,
    condition: u32,
    peak_condition: u32,
    pub description: String,
    pub mission: Option<Mission>,
    pub past_missions: Vec<Mission>,
    pub logs: Vec<Log>,
}

/// Wire form of [`Ship`]; deserialized ships go through [`Ship::new`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShipRecord {
    id: ShipId,
    name: String,
    status: ShipStatus,
    condition: u32,
    peak_condition: u32,
    description: String,
    mission: Option<Mission>,
    past_missions: Vec<Mission>,
    logs: Vec<Log>,
}

impl TryFrom<ShipRecord> for Ship {
    type Error = ModelError;

    fn try_from(record: ShipRecord) -> Result<Self, Self::Error> {
        let mut ship = Ship::new(record.id, record.name, record.condition, record.peak_condition)?;
        ship.status = record.status;
        ship.description = record.description;
        ship.mission = record.mission;
        ship.past_missions = record.past_missions;
        ship.logs = record.logs;
        Ok(ship)
    }
}

impl Ship {
    /// Creates a grounded ship.
    ///
    /// Fails if `peak_condition` exceeds [`MAX_PEAK_CONDITION`] or
    /// `condition` exceeds `peak_condition`.
    pub fn new(
        id: ShipId,
        name: impl Into<String>,
        condition: u32,
        peak_condition: u32,
    ) -> Result<Self, ModelError> {
        if peak_condition > MAX_PEAK_CONDITION {
            return Err(ModelError::PeakTooHigh {
                peak: peak_condition,
                max: MAX_PEAK_CONDITION,
            });
        }
        if condition > peak_condition {
            return Err(ModelError::ConditionAbovePeak {
                condition,
                peak: peak_condition,
            });
        }

        let status = if condition > 0 {
            ShipStatus::Ready
        } else {
            ShipStatus::Broken
        };

        Ok(Self {
            id,
            name: name.into(),
            status,
            condition,
            peak_condition,
            description: String::new(),
            mission: None,
            past_missions: Vec::new(),
            logs: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_mission(mut self, mission: Mission) -> Self {
        self.mission = Some(mission);
        self
    }

    pub fn condition(&self) -> u32 {
        self.condition
    }

    pub fn peak_condition(&self) -> u32 {
        self.peak_condition
    }

    /// Returns true once the ship is back at peak condition.
    pub fn is_fully_repaired(&self) -> bool {
        self.condition >= self.peak_condition
    }

    /// Restores one point of condition, capped at peak.
    pub fn repair_step(&mut self) {
        if self.condition < self.peak_condition {
            self.condition += 1;
        }
    }

    /// Removes one point of condition. Returns false if already at zero.
    pub fn degrade(&mut self) -> bool {
        if self.condition == 0 {
            return false;
        }
        self.condition -= 1;
        true
    }

    /// Resolves the landing outcome from the current condition.
    pub fn landing_outcome(&self) -> ShipStatus {
        ShipStatus::landing_outcome(self.condition, self.peak_condition)
    }

    /// Takes the mission off the ship, concluding it with the given result.
    ///
    /// The concluded mission is returned so the caller can persist it.
    pub fn conclude_mission(&mut self, completed: bool) -> Option<Mission> {
        let mut mission = self.mission.take()?;
        mission.conclude(completed);
        Some(mission)
    }
}
