//! Launch site: the takeoff scheduler.
//!
//! Ships queue up as `AWAITING_TAKEOFF (n)`. A single loop takes the head,
//! clears it for takeoff and runs the takeoff in one-second steps. A ship
//! that gets off the ground is handed to a transit worker; one that is
//! aborted during takeoff comes straight back down.
//!
//! ```text
//! AWAITING_TAKEOFF (n) ─► AWAITING_TAKEOFF (Next) ─► TAKING_OFF ─► OUTBOUND ─► transit
//!                                 │ abort                 │ abort
//!                                 ▼                       ▼
//!                               READY                  LANDING ─► READY / BROKEN / CRASHED
//! ```

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::persist::Persister;
use super::queue::ShipQueue;
use super::transit::{Direction, TransitRegistry};
use super::{landing_flavor, pause, roll, SchedulerError, SimContext};
use crate::flavor::FlavorCategory;
use crate::model::{Ship, ShipId, ShipStatus};
use crate::store::ShipStore;

const SCHEDULER: &str = "launch";

struct LaunchState {
    queue: ShipQueue,
    active: Option<ShipId>,
    interrupt: CancellationToken,
}

/// FIFO takeoff queue with a single background launch loop.
pub struct LaunchScheduler {
    ctx: SimContext,
    transit: Arc<TransitRegistry>,
    persister: OnceLock<Persister>,
    state: Mutex<LaunchState>,
}

impl LaunchScheduler {
    pub fn new(ctx: SimContext, transit: Arc<TransitRegistry>) -> Self {
        Self {
            ctx,
            transit,
            persister: OnceLock::new(),
            state: Mutex::new(LaunchState {
                queue: ShipQueue::new(ShipStatus::AwaitingTakeoff),
                active: None,
                interrupt: CancellationToken::new(),
            }),
        }
    }

    /// Binds the store and starts the launch loop.
    ///
    /// Returns the loop's handle, or `None` if already initialized.
    pub fn initialize(
        self: &Arc<Self>,
        store: Arc<dyn ShipStore>,
    ) -> Option<JoinHandle<Result<(), SchedulerError>>> {
        let persister = Persister::new(store, Arc::clone(&self.ctx.metrics));
        if self.persister.set(persister.clone()).is_err() {
            warn!("Launch site already initialized, ignoring");
            return None;
        }
        Some(tokio::spawn(Arc::clone(self).run(persister)))
    }

    /// Queues a ship for takeoff and returns its 1-based position.
    pub fn add_to_queue(&self, ship: Ship) -> Result<usize, SchedulerError> {
        let persister = self.persister.get().ok_or(SchedulerError::NotInitialized)?;
        let mut state = self.state.lock();
        if state.active == Some(ship.id) || state.queue.contains(ship.id) {
            return Err(SchedulerError::AlreadyQueued(ship.id));
        }

        let ship_id = ship.id;
        let (position, queued) = state.queue.push(ship);
        persister.ship(queued);
        info!(ship_id = %ship_id, position, "Ship queued for takeoff");
        Ok(position)
    }

    /// 1-based queue position, or -1 if the ship is not waiting.
    pub fn get_ship_number(&self, id: ShipId) -> i64 {
        self.state
            .lock()
            .queue
            .position(id)
            .map_or(-1, |p| p as i64)
    }

    /// Aborts the current takeoff at its next check point.
    pub fn request_interruption(&self) -> bool {
        let state = self.state.lock();
        if state.active.is_none() {
            return false;
        }
        state.interrupt.cancel();
        true
    }

    /// Aborts a ship's departure.
    ///
    /// The active ship is flagged and handled by the loop. A queued ship is
    /// taken off the queue at once, reset to `READY` and its mission
    /// concluded as not completed. Returns false if the ship is neither.
    pub fn abort_mission(&self, id: ShipId) -> bool {
        let Some(persister) = self.persister.get() else {
            return false;
        };

        let mut state = self.state.lock();
        if state.active == Some(id) {
            state.interrupt.cancel();
            info!(ship_id = %id, "Launch abort requested");
            return true;
        }

        let Some(mut ship) = state.queue.remove(id) else {
            return false;
        };
        for queued in state.queue.iter() {
            persister.ship(queued);
        }
        drop(state);

        if let Some(mission) = ship.conclude_mission(false) {
            persister.mission(&mission);
        }
        ship.status = ShipStatus::Ready;
        persister.ship(&ship);
        self.ctx.metrics.launch_aborted();
        info!(ship_id = %id, "Ship removed from takeoff queue");
        true
    }

    /// Aborts the active ship and empties the queue. Returns how many ships
    /// were affected.
    pub fn abort_all(&self) -> usize {
        let ids: Vec<ShipId> = {
            let state = self.state.lock();
            state
                .active
                .into_iter()
                .chain(state.queue.iter().map(|s| s.id))
                .collect()
        };
        ids.into_iter().filter(|id| self.abort_mission(*id)).count()
    }

    /// Whether the ship is queued or on the pad.
    pub fn holds(&self, id: ShipId) -> bool {
        let state = self.state.lock();
        state.active == Some(id) || state.queue.contains(id)
    }

    pub fn active_ship(&self) -> Option<ShipId> {
        self.state.lock().active
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    // =========================================================================
    // Launch loop
    // =========================================================================

    async fn run(self: Arc<Self>, persister: Persister) -> Result<(), SchedulerError> {
        info!("Launch site starting");
        let mut active: Option<(Ship, CancellationToken)> = None;

        while pause(self.ctx.config.idle_interval, &self.ctx.shutdown).await {
            active = match active.take() {
                None => self.activate_next(&persister),
                Some((ship, interrupt)) => match ship.status {
                    ShipStatus::AwaitingTakeoff(_) if interrupt.is_cancelled() => {
                        self.scrub(ship, &persister);
                        None
                    }
                    ShipStatus::AwaitingTakeoff(_) => {
                        let mut ship = ship;
                        ship.status = ShipStatus::TakingOff;
                        persister.ship(&ship);
                        info!(ship_id = %ship.id, "Ship taking off");
                        Some((ship, interrupt))
                    }
                    ShipStatus::TakingOff => {
                        self.take_off(ship, &interrupt, &persister).await;
                        None
                    }
                    status => {
                        error!(ship_id = %ship.id, %status, "Active ship in unexpected status, stopping launch site");
                        return Err(SchedulerError::StateViolation {
                            scheduler: SCHEDULER,
                            ship: ship.id,
                            status,
                        });
                    }
                },
            };
        }

        info!("Launch site stopped");
        Ok(())
    }

    fn activate_next(&self, persister: &Persister) -> Option<(Ship, CancellationToken)> {
        let mut state = self.state.lock();
        let ship = state.queue.pop_next()?;
        persister.ship(&ship);
        for queued in state.queue.iter() {
            persister.ship(queued);
        }

        state.active = Some(ship.id);
        state.interrupt = CancellationToken::new();
        debug!(ship_id = %ship.id, waiting = state.queue.len(), "Ship cleared for takeoff");
        Some((ship, state.interrupt.clone()))
    }

    /// Aborted before leaving the ground.
    fn scrub(&self, mut ship: Ship, persister: &Persister) {
        if let Some(mission) = ship.conclude_mission(false) {
            persister.mission(&mission);
        }
        ship.status = ShipStatus::Ready;
        persister.ship(&ship);
        self.ctx.metrics.launch_aborted();
        info!(ship_id = %ship.id, "Launch aborted before takeoff");
        self.release();
    }

    async fn take_off(&self, mut ship: Ship, interrupt: &CancellationToken, persister: &Persister) {
        let ctx = &self.ctx;

        for _ in 0..ctx.config.launch_steps() {
            if interrupt.is_cancelled() {
                break;
            }
            if !pause(ctx.config.launch_step, &ctx.shutdown).await {
                debug!(ship_id = %ship.id, "Shutdown during takeoff");
                self.release();
                return;
            }
            if roll(ctx.config.flavor.launch) {
                persister.flavor(&mut ship, &ctx.flavor, FlavorCategory::LaunchSite);
            }
        }

        if interrupt.is_cancelled() {
            self.abort_takeoff(ship, persister).await;
            return;
        }

        if let Some(mission) = ship.mission.as_mut() {
            mission.depart();
            mission.record("Departed the launch site");
            persister.mission(mission);
        }
        persister.flavor(&mut ship, &ctx.flavor, FlavorCategory::LaunchSiteFinish);
        ship.status = ShipStatus::Outbound;
        persister.ship(&ship);
        ctx.metrics.launched();
        info!(ship_id = %ship.id, name = %ship.name, "Ship launched");

        let ship_id = ship.id;
        if let Err(e) = self.transit.spawn(ship, Direction::ToSpace, persister.store()) {
            // The live flight owns the authoritative copy.
            error!(ship_id = %ship_id, error = %e, "Could not start transit");
        }
        self.hand_over(ship_id);
    }

    /// Clears the pad once the ship is in flight. An abort that arrived after
    /// the last takeoff check is passed on to the transit worker.
    fn hand_over(&self, ship_id: ShipId) {
        let mut state = self.state.lock();
        if state.interrupt.is_cancelled() && self.transit.abort_mission(ship_id) {
            info!(ship_id = %ship_id, "Late launch abort passed to transit");
        }
        state.active = None;
        state.interrupt = CancellationToken::new();
    }

    /// Aborted mid-takeoff: the ship comes back down and lands.
    async fn abort_takeoff(&self, mut ship: Ship, persister: &Persister) {
        let ctx = &self.ctx;
        warn!(ship_id = %ship.id, "Takeoff aborted, landing");
        ship.status = ShipStatus::Landing;
        persister.ship(&ship);

        if !pause(ctx.config.launch_duration, &ctx.shutdown).await {
            self.release();
            return;
        }

        let outcome = ship.landing_outcome();
        persister.flavor(&mut ship, &ctx.flavor, landing_flavor(outcome));
        if let Some(mission) = ship.conclude_mission(false) {
            persister.mission(&mission);
        }
        ship.status = outcome;
        persister.ship(&ship);
        ctx.metrics.launch_aborted();
        ctx.metrics.landed(outcome);
        info!(ship_id = %ship.id, status = %outcome, "Aborted takeoff landed");
        self.release();
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.active = None;
        state.interrupt = CancellationToken::new();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::SimulationConfig;
    use crate::model::{Log, Mission, MissionId, Objective};
    use crate::peer::MockPeerClient;
    use crate::sim::TransitOutcome;
    use crate::store::{MemoryStore, StoreError};

    struct Pad {
        launch: Arc<LaunchScheduler>,
        transit: Arc<TransitRegistry>,
        store: Arc<MemoryStore>,
        ctx: SimContext,
    }

    fn pad() -> Pad {
        let config = SimulationConfig::default()
            .with_flavor_probability(0.0)
            .with_degradation_probability(0.0);
        let ctx = SimContext::new(config);
        let transit = Arc::new(TransitRegistry::new(
            ctx.clone(),
            Arc::new(MockPeerClient::accepting()),
        ));
        let launch = Arc::new(LaunchScheduler::new(ctx.clone(), Arc::clone(&transit)));
        let store = Arc::new(MemoryStore::new());
        launch.initialize(store.clone()).unwrap();
        Pad {
            launch,
            transit,
            store,
            ctx,
        }
    }

    fn crewed(id: u64, condition: u32, peak: u32) -> Ship {
        Ship::new(ShipId(id), format!("Swift {}", id), condition, peak)
            .unwrap()
            .with_mission(Mission::new(MissionId(id), Objective::Explore, "Far side"))
    }

    fn label(store: &MemoryStore, id: u64) -> String {
        store.ship(ShipId(id)).unwrap().status.to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_before_initialize_fails() {
        let ctx = SimContext::new(SimulationConfig::default());
        let transit = Arc::new(TransitRegistry::new(
            ctx.clone(),
            Arc::new(MockPeerClient::accepting()),
        ));
        let launch = LaunchScheduler::new(ctx, transit);

        assert_eq!(
            launch.add_to_queue(crewed(1, 5, 10)).unwrap_err(),
            SchedulerError::NotInitialized
        );
        assert!(!launch.abort_mission(ShipId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_ships_relabel_as_queue_moves() {
        let pad = pad();

        assert_eq!(pad.launch.add_to_queue(crewed(1, 50, 100)).unwrap(), 1);
        assert_eq!(pad.launch.add_to_queue(crewed(2, 50, 100)).unwrap(), 2);
        assert_eq!(label(&pad.store, 1), "AWAITING_TAKEOFF (1)");
        assert_eq!(label(&pad.store, 2), "AWAITING_TAKEOFF (2)");

        tokio::time::sleep(Duration::from_secs(12)).await;

        assert_eq!(label(&pad.store, 1), "AWAITING_TAKEOFF (Next)");
        assert_eq!(label(&pad.store, 2), "AWAITING_TAKEOFF (1)");
        assert_eq!(pad.launch.get_ship_number(ShipId(2)), 1);
        assert_eq!(pad.launch.get_ship_number(ShipId(1)), -1);
        pad.ctx.shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_queued_ship() {
        let pad = pad();
        pad.launch.add_to_queue(crewed(1, 50, 100)).unwrap();
        pad.launch.add_to_queue(crewed(2, 50, 100)).unwrap();
        pad.launch.add_to_queue(crewed(3, 50, 100)).unwrap();

        assert!(pad.launch.abort_mission(ShipId(2)));

        let aborted = pad.store.ship(ShipId(2)).unwrap();
        assert_eq!(aborted.status, ShipStatus::Ready);
        assert!(aborted.mission.is_none());
        assert!(!pad.store.mission(MissionId(2)).unwrap().completed);
        assert_eq!(label(&pad.store, 3), "AWAITING_TAKEOFF (2)");
        assert!(!pad.launch.abort_mission(ShipId(2)), "already gone");
        pad.ctx.shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_before_takeoff_resets_ship() {
        let pad = pad();
        pad.launch.add_to_queue(crewed(1, 50, 100)).unwrap();

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(pad.launch.active_ship(), Some(ShipId(1)));
        assert!(pad.launch.abort_mission(ShipId(1)));
        tokio::time::sleep(Duration::from_secs(10)).await;

        let ship = pad.store.ship(ShipId(1)).unwrap();
        assert_eq!(ship.status, ShipStatus::Ready);
        assert!(ship.mission.is_none());

        let mission = pad.store.mission(MissionId(1)).unwrap();
        assert!(!mission.completed);
        assert!(mission.arrival_time.is_some());
        assert!(mission.departure_time.is_none());
        assert_eq!(pad.launch.active_ship(), None);
        assert_eq!(pad.transit.in_flight(), 0);
        pad.ctx.shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_mid_takeoff_crashes_wreck() {
        let pad = pad();
        pad.launch.add_to_queue(crewed(1, 0, 20)).unwrap();

        // Takeoff runs from t=30 to t=45.
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(label(&pad.store, 1), "TAKING_OFF");
        assert!(pad.launch.request_interruption());
        tokio::time::sleep(Duration::from_secs(30)).await;

        let ship = pad.store.ship(ShipId(1)).unwrap();
        assert_eq!(ship.status, ShipStatus::Crashed);
        assert!(ship.mission.is_none());
        assert!(!pad.store.mission(MissionId(1)).unwrap().completed);
        assert_eq!(pad.transit.in_flight(), 0);

        let metrics = pad.ctx.metrics.snapshot();
        assert_eq!(metrics.launch_aborts, 1);
        assert_eq!(metrics.landings_crashed, 1);
        assert_eq!(metrics.launches, 0);
        pad.ctx.shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_hands_ship_to_transit() {
        let pad = pad();
        pad.launch.add_to_queue(crewed(1, 50, 100)).unwrap();

        tokio::time::sleep(Duration::from_secs(50)).await;

        let ship = pad.store.ship(ShipId(1)).unwrap();
        assert_eq!(ship.status, ShipStatus::Outbound);
        assert!(ship.mission.as_ref().unwrap().departure_time.is_some());
        assert!(pad.transit.is_in_flight(ShipId(1)));
        assert!(!pad.launch.holds(ShipId(1)));
        assert_eq!(pad.ctx.metrics.snapshot().launches, 1);

        assert_eq!(
            pad.transit.wait_for(ShipId(1)).await,
            Some(TransitOutcome::Delivered)
        );
        assert_eq!(
            pad.store.ship(ShipId(1)).unwrap().status,
            ShipStatus::Active
        );
        pad.ctx.shutdown.cancel();
    }

    /// Store that asks the launch site to abort the ship as soon as it is
    /// saved `OUTBOUND`, after the last takeoff check has passed.
    struct AbortOnDeparture {
        inner: MemoryStore,
        launch: OnceLock<Arc<LaunchScheduler>>,
        accepted: Mutex<Option<bool>>,
    }

    impl ShipStore for AbortOnDeparture {
        fn save_ship(&self, ship: &Ship) -> Result<(), StoreError> {
            if ship.status == ShipStatus::Outbound && self.accepted.lock().is_none() {
                if let Some(launch) = self.launch.get() {
                    let accepted = launch.abort_mission(ship.id);
                    *self.accepted.lock() = Some(accepted);
                }
            }
            self.inner.save_ship(ship)
        }

        fn save_mission(&self, mission: &Mission) -> Result<(), StoreError> {
            self.inner.save_mission(mission)
        }

        fn save_log(&self, ship: ShipId, log: &Log) -> Result<(), StoreError> {
            self.inner.save_log(ship, log)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_during_departure_reaches_transit() {
        let config = SimulationConfig::default()
            .with_flavor_probability(0.0)
            .with_degradation_probability(0.0);
        let ctx = SimContext::new(config);
        let peer = Arc::new(MockPeerClient::accepting());
        let transit = Arc::new(TransitRegistry::new(ctx.clone(), peer.clone()));
        let launch = Arc::new(LaunchScheduler::new(ctx.clone(), Arc::clone(&transit)));
        let store = Arc::new(AbortOnDeparture {
            inner: MemoryStore::new(),
            launch: OnceLock::new(),
            accepted: Mutex::new(None),
        });
        let _ = store.launch.set(Arc::clone(&launch));
        launch.initialize(store.clone()).unwrap();

        launch.add_to_queue(crewed(1, 50, 100)).unwrap();
        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(*store.accepted.lock(), Some(true));

        let outcome = transit.wait_for(ShipId(1)).await;
        assert_eq!(outcome, Some(TransitOutcome::Landed(ShipStatus::Ready)));
        assert_eq!(peer.attempts(), 0);
        assert!(!store.inner.mission(MissionId(1)).unwrap().completed);
        ctx.shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_all_clears_queue_and_pad() {
        let pad = pad();
        pad.launch.add_to_queue(crewed(1, 50, 100)).unwrap();
        pad.launch.add_to_queue(crewed(2, 50, 100)).unwrap();
        pad.launch.add_to_queue(crewed(3, 50, 100)).unwrap();
        tokio::time::sleep(Duration::from_secs(12)).await;

        assert_eq!(pad.launch.abort_all(), 3);
        assert_eq!(pad.launch.queue_len(), 0);
        assert_eq!(label(&pad.store, 3), "READY");
        pad.ctx.shutdown.cancel();
    }
}
