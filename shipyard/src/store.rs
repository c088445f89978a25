//! Persistence contract consumed by the simulation.
//!
//! The engine never talks to a database. It hands snapshots of ships,
//! missions and logs to a [`ShipStore`] supplied by the surrounding
//! application. Saves are idempotent upserts.
//!
//! Failures are not retried. Callers log them and carry on with the cycle;
//! the next save of the same entity overwrites whatever was missed.
//!
//! # Example
//!
//! ```
//! use shipyard::model::{Ship, ShipId};
//! use shipyard::store::{MemoryStore, ShipStore};
//!
//! let store = MemoryStore::new();
//! let ship = Ship::new(ShipId(1), "Kestrel", 4, 10).unwrap();
//! store.save_ship(&ship).unwrap();
//! assert_eq!(store.ship(ShipId(1)).unwrap().name, "Kestrel");
//! ```

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use crate::model::{Log, Mission, MissionId, Ship, ShipId};

/// Errors reported by a store implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the entity.
    #[error("Store rejected {entity}: {reason}")]
    Rejected { entity: String, reason: String },
}

/// Save callbacks for the simulation's entities.
pub trait ShipStore: Send + Sync + 'static {
    /// Upserts the ship.
    fn save_ship(&self, ship: &Ship) -> Result<(), StoreError>;

    /// Upserts a mission.
    fn save_mission(&self, mission: &Mission) -> Result<(), StoreError>;

    /// Upserts a log belonging to the given ship.
    fn save_log(&self, ship: ShipId, log: &Log) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryStoreInner {
    ships: HashMap<ShipId, Ship>,
    missions: HashMap<MissionId, Mission>,
    logs: HashMap<ShipId, Vec<Log>>,
    ship_saves: usize,
}

/// In-memory [`ShipStore`] keeping the latest snapshot of every entity.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a ship without counting it as a save.
    pub fn insert(&self, ship: Ship) {
        self.inner.lock().ships.insert(ship.id, ship);
    }

    /// Latest saved snapshot of a ship.
    pub fn ship(&self, id: ShipId) -> Option<Ship> {
        self.inner.lock().ships.get(&id).cloned()
    }

    /// All saved ships ordered by id.
    pub fn ships(&self) -> Vec<Ship> {
        let inner = self.inner.lock();
        let mut ships: Vec<Ship> = inner.ships.values().cloned().collect();
        ships.sort_by_key(|s| s.id);
        ships
    }

    /// Latest saved snapshot of a mission.
    pub fn mission(&self, id: MissionId) -> Option<Mission> {
        self.inner.lock().missions.get(&id).cloned()
    }

    /// Logs saved for a ship, in save order.
    pub fn logs(&self, ship: ShipId) -> Vec<Log> {
        self.inner
            .lock()
            .logs
            .get(&ship)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of ship saves, useful for asserting persistence happened.
    pub fn ship_saves(&self) -> usize {
        self.inner.lock().ship_saves
    }
}

impl ShipStore for MemoryStore {
    fn save_ship(&self, ship: &Ship) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.ship_saves += 1;
        inner.ships.insert(ship.id, ship.clone());
        Ok(())
    }

    fn save_mission(&self, mission: &Mission) -> Result<(), StoreError> {
        self.inner
            .lock()
            .missions
            .insert(mission.id, mission.clone());
        Ok(())
    }

    fn save_log(&self, ship: ShipId, log: &Log) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let logs = inner.logs.entry(ship).or_default();
        if !logs.iter().any(|existing| existing.id == log.id) {
            logs.push(log.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::model::{MissionId, Objective};

    /// Store that rejects every save, for exercising the log-and-continue path.
    pub struct FailingStore;

    impl ShipStore for FailingStore {
        fn save_ship(&self, ship: &Ship) -> Result<(), StoreError> {
            Err(StoreError::Rejected {
                entity: format!("ship {}", ship.id),
                reason: "read-only".to_string(),
            })
        }

        fn save_mission(&self, _mission: &Mission) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        fn save_log(&self, _ship: ShipId, _log: &Log) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_save_ship_overwrites() {
        let store = MemoryStore::new();
        let mut ship = Ship::new(ShipId(1), "Tern", 2, 10).unwrap();
        store.save_ship(&ship).unwrap();
        ship.repair_step();
        store.save_ship(&ship).unwrap();

        assert_eq!(store.ship(ShipId(1)).unwrap().condition(), 3);
        assert_eq!(store.ship_saves(), 2);
        assert_eq!(store.ships().len(), 1);
    }

    #[test]
    fn test_save_log_is_idempotent() {
        let store = MemoryStore::new();
        let log = Log::new("Docked");
        store.save_log(ShipId(1), &log).unwrap();
        store.save_log(ShipId(1), &log).unwrap();
        assert_eq!(store.logs(ShipId(1)).len(), 1);
        assert!(store.logs(ShipId(2)).is_empty());
    }

    #[test]
    fn test_save_mission() {
        let store = MemoryStore::new();
        let mission = Mission::new(MissionId(5), Objective::Survey, "Belt");
        store.save_mission(&mission).unwrap();
        assert_eq!(store.mission(MissionId(5)).unwrap().title, "Belt");
    }

    #[test]
    fn test_failing_store_reports_errors() {
        let ship = Ship::new(ShipId(3), "Ghost", 1, 1).unwrap();
        let err = FailingStore.save_ship(&ship).unwrap_err();
        assert!(err.to_string().contains("ship 3"));
    }
}
