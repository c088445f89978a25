//! Drydock: the repair scheduler.
//!
//! Ships queue up as `AWAITING_REPAIRS (n)`. A single background loop takes
//! the head of the queue and walks it through three idle-separated phases:
//!
//! ```text
//! AWAITING_REPAIRS (n) ──► AWAITING_REPAIRS (Next) ──► REPAIR_IN_PROGRESS
//!                                                          │ +1 condition per tick
//!                                                          ▼
//!                                            READY (condition > 0) / BROKEN
//! ```
//!
//! # Example
//!
//! ```ignore
//! let drydock = Arc::new(RepairScheduler::new(ctx));
//! let handle = drydock.initialize(store).expect("first initialize");
//!
//! drydock.add_to_queue(ship)?;
//! assert_eq!(drydock.get_ship_number(ship_id), 1);
//! ```

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::persist::Persister;
use super::queue::ShipQueue;
use super::{pause, roll, SchedulerError, SimContext};
use crate::flavor::FlavorCategory;
use crate::model::{Ship, ShipId, ShipStatus};
use crate::store::ShipStore;

const SCHEDULER: &str = "drydock";

struct DrydockState {
    queue: ShipQueue,
    active: Option<ShipId>,
    /// Cancelled by `request_interruption` while a ship is active.
    interrupt: CancellationToken,
}

/// FIFO repair queue with a single background repair loop.
pub struct RepairScheduler {
    ctx: SimContext,
    persister: OnceLock<Persister>,
    state: Mutex<DrydockState>,
}

impl RepairScheduler {
    pub fn new(ctx: SimContext) -> Self {
        Self {
            ctx,
            persister: OnceLock::new(),
            state: Mutex::new(DrydockState {
                queue: ShipQueue::new(ShipStatus::AwaitingRepairs),
                active: None,
                interrupt: CancellationToken::new(),
            }),
        }
    }

    /// Binds the store and starts the repair loop.
    ///
    /// Returns the loop's handle, or `None` if already initialized. Must be
    /// called from within a tokio runtime.
    pub fn initialize(
        self: &Arc<Self>,
        store: Arc<dyn ShipStore>,
    ) -> Option<JoinHandle<Result<(), SchedulerError>>> {
        let persister = Persister::new(store, Arc::clone(&self.ctx.metrics));
        if self.persister.set(persister.clone()).is_err() {
            warn!("Drydock already initialized, ignoring");
            return None;
        }
        Some(tokio::spawn(Arc::clone(self).run(persister)))
    }

    /// Queues a ship for repairs and returns its 1-based position.
    pub fn add_to_queue(&self, ship: Ship) -> Result<usize, SchedulerError> {
        let persister = self.persister.get().ok_or(SchedulerError::NotInitialized)?;
        let mut state = self.state.lock();
        if state.active == Some(ship.id) || state.queue.contains(ship.id) {
            return Err(SchedulerError::AlreadyQueued(ship.id));
        }

        let ship_id = ship.id;
        let (position, queued) = state.queue.push(ship);
        persister.ship(queued);
        debug!(ship_id = %ship_id, position, "Ship queued for repairs");
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

    /// Cuts the current repair short at the next tick.
    ///
    /// Queued ships are unaffected. Returns false when no ship is active.
    pub fn request_interruption(&self) -> bool {
        let state = self.state.lock();
        match state.active {
            Some(ship_id) => {
                info!(ship_id = %ship_id, "Repair interruption requested");
                state.interrupt.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether the ship is queued or in the drydock.
    pub fn holds(&self, id: ShipId) -> bool {
        let state = self.state.lock();
        state.active == Some(id) || state.queue.contains(id)
    }

    /// The ship currently occupying the drydock.
    pub fn active_ship(&self) -> Option<ShipId> {
        self.state.lock().active
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    // =========================================================================
    // Repair loop
    // =========================================================================

    async fn run(self: Arc<Self>, persister: Persister) -> Result<(), SchedulerError> {
        info!("Drydock starting");
        let mut active: Option<(Ship, CancellationToken)> = None;

        while pause(self.ctx.config.idle_interval, &self.ctx.shutdown).await {
            active = match active.take() {
                None => self.activate_next(&persister),
                Some((mut ship, interrupt)) => match ship.status {
                    ShipStatus::AwaitingRepairs(_) => {
                        ship.status = ShipStatus::RepairInProgress;
                        persister.ship(&ship);
                        debug!(ship_id = %ship.id, condition = ship.condition(), "Repair started");
                        Some((ship, interrupt))
                    }
                    ShipStatus::RepairInProgress => {
                        self.repair(ship, &interrupt, &persister).await;
                        None
                    }
                    status => {
                        error!(ship_id = %ship.id, %status, "Active ship in unexpected status, stopping drydock");
                        return Err(SchedulerError::StateViolation {
                            scheduler: SCHEDULER,
                            ship: ship.id,
                            status,
                        });
                    }
                },
            };
        }

        info!("Drydock stopped");
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
        debug!(ship_id = %ship.id, waiting = state.queue.len(), "Ship moved into drydock");
        Some((ship, state.interrupt.clone()))
    }

    async fn repair(&self, mut ship: Ship, interrupt: &CancellationToken, persister: &Persister) {
        let ctx = &self.ctx;

        while !interrupt.is_cancelled() && !ship.is_fully_repaired() {
            if !pause(ctx.config.repair_tick, &ctx.shutdown).await {
                debug!(ship_id = %ship.id, condition = ship.condition(), "Shutdown during repair");
                self.release();
                return;
            }
            if roll(ctx.config.flavor.repair) {
                persister.flavor(&mut ship, &ctx.flavor, FlavorCategory::DryDock);
            }
            ship.repair_step();
            persister.ship(&ship);
        }

        let interrupted = !ship.is_fully_repaired();
        persister.flavor(&mut ship, &ctx.flavor, FlavorCategory::DryDockFinish);
        ship.status = if ship.condition() > 0 {
            ShipStatus::Ready
        } else {
            ShipStatus::Broken
        };
        persister.ship(&ship);
        ctx.metrics.repair_finished(interrupted);

        info!(
            ship_id = %ship.id,
            name = %ship.name,
            condition = ship.condition(),
            peak = ship.peak_condition(),
            status = %ship.status,
            interrupted,
            "Repair finished"
        );
        self.release();
    }

    /// Clears the active slot and discards any pending interruption.
    fn release(&self) {
        let mut state = self.state.lock();
        state.active = None;
        state.interrupt = CancellationToken::new();
    }
}
