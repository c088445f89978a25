//! The shipyard facade.
//!
//! [`Shipyard`] owns the drydock, the launch site and the transit registry,
//! binds them to one store and one shutdown token, and is the single place
//! where the simulation is started and stopped.
//!
//! # Example
//!
//! ```ignore
//! use shipyard::{MemoryStore, Shipyard, ShipyardConfig};
//!
//! let store = Arc::new(MemoryStore::new());
//! let shipyard = Shipyard::start(&ShipyardConfig::default(), store)?;
//!
//! shipyard.launch(ship)?;
//! // ...
//! shipyard.shutdown().await?;
//! ```

mod error;

pub use error::AppError;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ShipyardConfig;
use crate::model::{Ship, ShipId};
use crate::peer::{PeerClient, ReqwestPeerClient};
use crate::sim::{
    LaunchScheduler, RepairScheduler, SchedulerError, SimContext, TransitOutcome, TransitRegistry,
};
use crate::store::ShipStore;
use crate::telemetry::MetricsSnapshot;

/// A running simulation.
pub struct Shipyard {
    ctx: SimContext,
    store: Arc<dyn ShipStore>,
    drydock: Arc<RepairScheduler>,
    launch: Arc<LaunchScheduler>,
    transit: Arc<TransitRegistry>,
    /// Held across the cross-component check and the enqueue, so a ship
    /// cannot be admitted to two components at once.
    admission: Mutex<()>,
    loops: Vec<JoinHandle<Result<(), SchedulerError>>>,
}

impl Shipyard {
    /// Starts the simulation with the HTTP peer client described by `config`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &ShipyardConfig, store: Arc<dyn ShipStore>) -> Result<Self, AppError> {
        config.simulation.validate()?;
        let peer = ReqwestPeerClient::new(&config.peer)?;
        info!(peer_url = %peer.url(), "Peer system configured");

        let ctx = SimContext::new(config.simulation.clone());
        Ok(Self::with_peer(ctx, store, Arc::new(peer)))
    }

    /// Starts the simulation with an explicit context and peer client.
    pub fn with_peer(ctx: SimContext, store: Arc<dyn ShipStore>, peer: Arc<dyn PeerClient>) -> Self {
        let transit = Arc::new(TransitRegistry::new(ctx.clone(), peer));
        let drydock = Arc::new(RepairScheduler::new(ctx.clone()));
        let launch = Arc::new(LaunchScheduler::new(ctx.clone(), Arc::clone(&transit)));

        let loops = [
            drydock.initialize(Arc::clone(&store)),
            launch.initialize(Arc::clone(&store)),
        ]
        .into_iter()
        .flatten()
        .collect();

        info!("Shipyard started");
        Self {
            ctx,
            store,
            drydock,
            launch,
            transit,
            admission: Mutex::new(()),
            loops,
        }
    }

    /// Sends a ship to the drydock. Returns its queue position.
    ///
    /// Refused while the ship is waiting at the launch site or in flight.
    pub fn repair(&self, ship: Ship) -> Result<usize, SchedulerError> {
        let _admission = self.admission.lock();
        if self.launch.holds(ship.id) || self.transit.is_in_flight(ship.id) {
            return Err(SchedulerError::AlreadyQueued(ship.id));
        }
        self.drydock.add_to_queue(ship)
    }

    /// Sends a ship to the launch site. Returns its queue position.
    ///
    /// Refused while the ship is in the drydock or in flight.
    pub fn launch(&self, ship: Ship) -> Result<usize, SchedulerError> {
        let _admission = self.admission.lock();
        if self.drydock.holds(ship.id) || self.transit.is_in_flight(ship.id) {
            return Err(SchedulerError::AlreadyQueued(ship.id));
        }
        self.launch.add_to_queue(ship)
    }

    /// Brings a ship back from the peer system and lands it.
    pub fn receive(&self, ship: Ship) -> Result<(), AppError> {
        let _admission = self.admission.lock();
        if self.drydock.holds(ship.id) || self.launch.holds(ship.id) {
            return Err(SchedulerError::AlreadyQueued(ship.id).into());
        }
        self.transit.receive(ship, Arc::clone(&self.store))?;
        Ok(())
    }

    /// Aborts the ship's mission, on the launch pad or outbound.
    pub fn abort_mission(&self, id: ShipId) -> bool {
        self.launch.abort_mission(id) || self.transit.abort_mission(id)
    }

    /// Aborts every departing and outbound ship. Returns how many were affected.
    pub fn abort_all_missions(&self) -> usize {
        self.launch.abort_all() + self.transit.abort_all()
    }

    pub fn drydock(&self) -> &RepairScheduler {
        &self.drydock
    }

    pub fn launch_site(&self) -> &LaunchScheduler {
        &self.launch
    }

    pub fn transit(&self) -> &TransitRegistry {
        &self.transit
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// Token that stops the whole simulation when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.ctx.shutdown.clone()
    }

    /// Stops every loop and worker and waits for them.
    ///
    /// Returns the first state violation a scheduler loop stopped with.
    pub async fn shutdown(self) -> Result<Vec<TransitOutcome>, SchedulerError> {
        info!("Shipyard shutting down");
        self.ctx.shutdown.cancel();

        let mut result = Ok(());
        for handle in self.loops {
            match handle.await {
                Ok(Err(e)) if result.is_ok() => result = Err(e),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Scheduler task failed"),
            }
        }
        let outcomes = self.transit.join_all().await;

        info!(transits = outcomes.len(), "Shipyard stopped");
        result.map(|()| outcomes)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::SimulationConfig;
    use crate::model::{Mission, MissionId, Objective, ShipStatus};
    use crate::peer::MockPeerClient;
    use crate::store::MemoryStore;

    fn shipyard(peer: MockPeerClient) -> (Shipyard, Arc<MemoryStore>) {
        let config = SimulationConfig::default()
            .with_flavor_probability(0.0)
            .with_degradation_probability(0.0);
        let store = Arc::new(MemoryStore::new());
        let yard = Shipyard::with_peer(SimContext::new(config), store.clone(), Arc::new(peer));
        (yard, store)
    }

    fn ship(id: u64) -> Ship {
        Ship::new(ShipId(id), format!("Vela {}", id), 60, 100)
            .unwrap()
            .with_mission(Mission::new(MissionId(id), Objective::Deliver, "Relay"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ship_cannot_be_in_two_schedulers() {
        let (yard, _) = shipyard(MockPeerClient::accepting());

        yard.repair(ship(1)).unwrap();
        assert_eq!(
            yard.launch(ship(1)).unwrap_err(),
            SchedulerError::AlreadyQueued(ShipId(1))
        );

        yard.launch(ship(2)).unwrap();
        assert_eq!(
            yard.repair(ship(2)).unwrap_err(),
            SchedulerError::AlreadyQueued(ShipId(2))
        );
        assert!(matches!(
            yard.receive(ship(2)),
            Err(AppError::Scheduler(SchedulerError::AlreadyQueued(_)))
        ));
        yard.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_admission_picks_one_component() {
        let (yard, _) = shipyard(MockPeerClient::accepting());

        for id in 1..=50 {
            let barrier = std::sync::Barrier::new(2);
            let (repaired, launched) = std::thread::scope(|s| {
                let repair = s.spawn(|| {
                    barrier.wait();
                    yard.repair(ship(id)).is_ok()
                });
                let launch = s.spawn(|| {
                    barrier.wait();
                    yard.launch(ship(id)).is_ok()
                });
                (repair.join().unwrap(), launch.join().unwrap())
            });
            assert_ne!(repaired, launched, "ship {} must land in exactly one queue", id);
        }
        yard.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_reaches_outbound_ship() {
        let (yard, store) = shipyard(MockPeerClient::refusing());
        yard.launch(ship(1)).unwrap();

        // Launched at t=45; outbound through the first travel leg.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(yard.transit().is_in_flight(ShipId(1)));
        assert!(yard.abort_mission(ShipId(1)));
        assert!(!yard.abort_mission(ShipId(99)));

        tokio::time::sleep(Duration::from_secs(400)).await;
        let landed = store.ship(ShipId(1)).unwrap();
        assert_eq!(landed.status, ShipStatus::Ready);
        assert!(!landed.past_missions[0].completed);
        assert_eq!(yard.metrics().delivery_attempts_failed, 0);
        yard.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_joins_everything() {
        let (yard, _) = shipyard(MockPeerClient::accepting());
        yard.launch(ship(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(50)).await;

        let outcomes = yard.shutdown().await.unwrap();
        assert_eq!(outcomes, vec![TransitOutcome::Interrupted]);
    }
}
