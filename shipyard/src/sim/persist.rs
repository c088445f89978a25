//! Log-and-continue persistence.
//!
//! Store failures never abort a cycle. They are logged, counted, and the
//! next save of the same entity carries the up-to-date state.

use std::sync::Arc;

use tracing::warn;

use crate::flavor::{FlavorCategory, FlavorText};
use crate::model::{Log, Mission, Ship};
use crate::store::ShipStore;
use crate::telemetry::SimulationMetrics;

#[derive(Clone)]
pub(crate) struct Persister {
    store: Arc<dyn ShipStore>,
    metrics: Arc<SimulationMetrics>,
}

impl Persister {
    pub(crate) fn new(store: Arc<dyn ShipStore>, metrics: Arc<SimulationMetrics>) -> Self {
        Self { store, metrics }
    }

    pub(crate) fn store(&self) -> Arc<dyn ShipStore> {
        Arc::clone(&self.store)
    }

    pub(crate) fn ship(&self, ship: &Ship) {
        if let Err(e) = self.store.save_ship(ship) {
            warn!(ship_id = %ship.id, status = %ship.status, error = %e, "Failed to persist ship");
            self.metrics.persistence_failed();
        }
    }

    pub(crate) fn mission(&self, mission: &Mission) {
        if let Err(e) = self.store.save_mission(mission) {
            warn!(mission_id = %mission.id, error = %e, "Failed to persist mission");
            self.metrics.persistence_failed();
        }
    }

    /// Saves the log, appends it to the ship and saves the ship.
    pub(crate) fn log(&self, ship: &mut Ship, log: Log) {
        if let Err(e) = self.store.save_log(ship.id, &log) {
            warn!(ship_id = %ship.id, error = %e, "Failed to persist log");
            self.metrics.persistence_failed();
        }
        ship.logs.push(log);
        self.ship(ship);
    }

    /// Writes a flavor log from the category, if it has any snippets.
    pub(crate) fn flavor(&self, ship: &mut Ship, flavor: &FlavorText, category: FlavorCategory) {
        if let Some(log) = flavor.generate_ship_log(ship, category) {
            self.log(ship, log);
        }
    }
}
