//! Ship logs and mission events.
//!
//! Both are append-only from the engine's point of view: the simulation
//! creates entries and never edits or removes them.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Global sequence counter for log and event identities.
static ENTRY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_entry_id() -> u64 {
    ENTRY_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// A timestamped narrative entry attached to a ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

impl Log {
    /// Creates a log stamped with the current time.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: next_entry_id(),
            timestamp: Utc::now(),
            description: description.into(),
        }
    }
}

/// A timestamped entry attached to a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

impl Event {
    /// Creates an event stamped with the current time.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: next_entry_id(),
            timestamp: Utc::now(),
            description: description.into(),
        }
    }
}
