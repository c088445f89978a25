//! Missions flown by ships.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Event;

/// Mission identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(pub u64);

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a mission sets out to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Objective {
    Explore,
    Survey,
    Deliver,
    Rescue,
}

/// A point in mission space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A mission assigned to a ship.
///
/// The spatial volume is a sphere of `radius` around `center`. Timestamps
/// stay `None` until the ship actually departs or comes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: MissionId,
    pub objective: Objective,
    pub title: String,
    pub description: String,
    pub center: Coordinates,
    pub radius: f64,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub current_destination: Option<Coordinates>,
    pub completed: bool,
    pub events: Vec<Event>,
}

impl Mission {
    /// Creates a mission that has not departed yet.
    pub fn new(id: MissionId, objective: Objective, title: impl Into<String>) -> Self {
        Self {
            id,
            objective,
            title: title.into(),
            description: String::new(),
            center: Coordinates::default(),
            radius: 0.0,
            departure_time: None,
            arrival_time: None,
            current_destination: None,
            completed: false,
            events: Vec::new(),
        }
    }

    /// Sets the mission description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the mission volume.
    pub fn with_volume(mut self, center: Coordinates, radius: f64) -> Self {
        self.center = center;
        self.radius = radius.max(0.0);
        self.current_destination = Some(center);
        self
    }

    /// Appends an event stamped now.
    pub fn record(&mut self, description: impl Into<String>) {
        self.events.push(Event::new(description));
    }

    /// Stamps the departure time.
    pub fn depart(&mut self) {
        self.departure_time = Some(Utc::now());
    }

    /// Stamps the arrival time and records whether the objective was met.
    pub fn conclude(&mut self, completed: bool) {
        self.completed = completed;
        self.arrival_time = Some(Utc::now());
    }
}
