//! Ships in flight.
//!
//! Each departing or returning ship gets its own tokio task, a
//! `TransitWorker`, which owns the ship until it lands or is handed off to
//! the peer system. The [`TransitRegistry`] tracks the live workers by ship
//! id so missions can be aborted and duplicate flights refused.
//!
//! ```text
//!  ToSpace:   OUTBOUND ─► travel ─► travel ─► handoff ──ok──► ACTIVE
//!                            │ abort            │ 5 failures
//!                            ▼                  ▼
//!                         INBOUND ◄─────────────┘
//!  ToSurface:             INBOUND ─► travel ─► LANDING ─► travel ─► outcome
//! ```
//!
//! Travel advances in one-second steps. Every step may knock a point of
//! condition off the hull and may write a flavor log; an abort is noticed at
//! the end of a step, and only while the ship is still outbound.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::persist::Persister;
use super::{landing_flavor, pause, roll, SimContext};
use crate::flavor::FlavorCategory;
use crate::model::{Ship, ShipId, ShipStatus};
use crate::peer::{PeerClient, RetryPolicy};
use crate::store::ShipStore;

/// Errors starting a transit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitError {
    #[error("Ship {0} already has a live transit")]
    AlreadyInFlight(ShipId),
}

/// Which way a ship is travelling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Departing for the peer system.
    #[default]
    ToSpace,
    /// Returning to the surface to land.
    ToSurface,
}

/// How a transit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitOutcome {
    /// The peer system accepted the ship; it is `ACTIVE`.
    Delivered,
    /// The ship landed with the given status.
    Landed(ShipStatus),
    /// Shutdown stopped the worker mid-flight.
    Interrupted,
}

struct InFlight {
    direction: Direction,
    abort: CancellationToken,
    handle: JoinHandle<TransitOutcome>,
}

impl InFlight {
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Live transit workers keyed by ship.
pub struct TransitRegistry {
    ctx: SimContext,
    peer: Arc<dyn PeerClient>,
    workers: DashMap<ShipId, InFlight>,
}

impl TransitRegistry {
    pub fn new(ctx: SimContext, peer: Arc<dyn PeerClient>) -> Self {
        Self {
            ctx,
            peer,
            workers: DashMap::new(),
        }
    }

    /// Starts a worker that owns the ship until it concludes.
    ///
    /// Refused if the ship already has a live worker. Must be called from
    /// within a tokio runtime.
    pub fn spawn(
        &self,
        ship: Ship,
        direction: Direction,
        store: Arc<dyn ShipStore>,
    ) -> Result<(), TransitError> {
        self.cleanup();

        let ship_id = ship.id;
        let slot = match self.workers.entry(ship_id) {
            Entry::Occupied(e) if e.get().is_live() => {
                return Err(TransitError::AlreadyInFlight(ship_id));
            }
            entry => entry,
        };

        let abort = CancellationToken::new();
        let worker = TransitWorker {
            ship,
            direction,
            mission_completed: true,
            ctx: self.ctx.clone(),
            peer: Arc::clone(&self.peer),
            persister: Persister::new(store, Arc::clone(&self.ctx.metrics)),
            abort: abort.clone(),
        };
        let in_flight = InFlight {
            direction,
            abort,
            handle: tokio::spawn(worker.run()),
        };

        match slot {
            Entry::Occupied(mut e) => {
                e.insert(in_flight);
            }
            Entry::Vacant(e) => {
                e.insert(in_flight);
            }
        }
        debug!(ship_id = %ship_id, ?direction, "Transit started");
        Ok(())
    }

    /// Brings a ship back from the peer system and lands it.
    ///
    /// The mission, if any, is concluded as completed.
    pub fn receive(&self, ship: Ship, store: Arc<dyn ShipStore>) -> Result<(), TransitError> {
        self.spawn(ship, Direction::ToSurface, store)
    }

    /// Turns an outbound ship around. Returns false if no live outbound
    /// worker carries the ship.
    pub fn abort_mission(&self, id: ShipId) -> bool {
        self.cleanup();
        match self.workers.get(&id) {
            Some(w) if w.direction == Direction::ToSpace && w.is_live() => {
                w.abort.cancel();
                info!(ship_id = %id, "Transit abort requested");
                true
            }
            _ => false,
        }
    }

    /// Aborts every live outbound worker. Returns how many were signalled.
    pub fn abort_all(&self) -> usize {
        let mut aborted = 0;
        for w in self.workers.iter() {
            if w.direction == Direction::ToSpace && w.is_live() {
                w.abort.cancel();
                aborted += 1;
            }
        }
        aborted
    }

    /// Drops finished workers. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let before = self.workers.len();
        self.workers.retain(|_, w| w.is_live());
        before - self.workers.len()
    }

    pub fn is_in_flight(&self, id: ShipId) -> bool {
        self.workers.get(&id).is_some_and(|w| w.is_live())
    }

    /// Number of live workers.
    pub fn in_flight(&self) -> usize {
        self.workers.iter().filter(|w| w.is_live()).count()
    }

    /// Waits for the ship's worker to finish and removes it.
    pub async fn wait_for(&self, id: ShipId) -> Option<TransitOutcome> {
        let (_, in_flight) = self.workers.remove(&id)?;
        join_worker(id, in_flight).await
    }

    /// Waits for every worker to finish. Used at shutdown.
    pub async fn join_all(&self) -> Vec<TransitOutcome> {
        let ids: Vec<ShipId> = self.workers.iter().map(|w| *w.key()).collect();
        let pending = ids
            .into_iter()
            .filter_map(|id| self.workers.remove(&id))
            .map(|(id, in_flight)| join_worker(id, in_flight));
        join_all(pending).await.into_iter().flatten().collect()
    }
}

async fn join_worker(id: ShipId, in_flight: InFlight) -> Option<TransitOutcome> {
    match in_flight.handle.await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            error!(ship_id = %id, error = %e, "Transit worker failed");
            None
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

enum Travel {
    Arrived,
    Aborted,
    Shutdown,
}

struct TransitWorker {
    ship: Ship,
    direction: Direction,
    mission_completed: bool,
    ctx: SimContext,
    peer: Arc<dyn PeerClient>,
    persister: Persister,
    abort: CancellationToken,
}

impl TransitWorker {
    async fn run(mut self) -> TransitOutcome {
        match self.direction {
            Direction::ToSpace => self.to_space().await,
            Direction::ToSurface => {
                self.ship.status = ShipStatus::Inbound;
                self.persister.ship(&self.ship);
                info!(ship_id = %self.ship.id, "Ship received, inbound");
                self.land().await
            }
        }
    }

    async fn to_space(mut self) -> TransitOutcome {
        loop {
            if let Travel::Shutdown = self.travel().await {
                return self.suspend();
            }

            match self.ship.status {
                ShipStatus::Outbound => {
                    match self.travel().await {
                        Travel::Shutdown => return self.suspend(),
                        Travel::Aborted => {
                            warn!(ship_id = %self.ship.id, "Mission aborted, returning");
                            self.mission_completed = false;
                            self.record_event("Mission aborted, returning to surface");
                            self.ship.status = ShipStatus::Inbound;
                            self.persister.ship(&self.ship);
                            continue;
                        }
                        Travel::Arrived => {}
                    }

                    match self.hand_off().await {
                        Some(true) => return TransitOutcome::Delivered,
                        Some(false) => {
                            warn!(ship_id = %self.ship.id, "Peer unreachable, making a return trip");
                            self.ship.status = ShipStatus::Inbound;
                            self.persister.ship(&self.ship);
                        }
                        None => return self.suspend(),
                    }
                }
                ShipStatus::Inbound => return self.land().await,
                status => {
                    warn!(ship_id = %self.ship.id, %status, "Departed in unexpected status, bringing it home");
                    self.ship.status = ShipStatus::Inbound;
                    self.persister.ship(&self.ship);
                }
            }
        }
    }

    /// Offers the ship to the peer system. `None` on shutdown.
    async fn hand_off(&mut self) -> Option<bool> {
        let policy = RetryPolicy::delivery(&self.ctx.config);
        let mut attempt = 1;

        while let Some(delay) = policy.delay_for_attempt(attempt) {
            if !pause(delay, &self.ctx.shutdown).await {
                return None;
            }
            match self.peer.deliver(&self.ship).await {
                Ok(()) => {
                    self.ship.status = ShipStatus::Active;
                    self.record_event("Handed off to the peer system");
                    self.persister.ship(&self.ship);
                    self.ctx.metrics.delivery_succeeded();
                    info!(ship_id = %self.ship.id, attempt, "Ship delivered");
                    return Some(true);
                }
                Err(e) => {
                    self.ctx.metrics.delivery_attempt_failed();
                    warn!(
                        ship_id = %self.ship.id,
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "Delivery attempt failed"
                    );
                }
            }
            attempt += 1;
        }

        self.record_event(format!(
            "Handoff abandoned after {} attempts",
            policy.max_attempts
        ));
        Some(false)
    }

    async fn land(mut self) -> TransitOutcome {
        if let Travel::Shutdown = self.travel().await {
            return self.suspend();
        }
        info!(ship_id = %self.ship.id, "Attempting to land");
        self.ship.status = ShipStatus::Landing;
        self.persister.ship(&self.ship);

        if let Travel::Shutdown = self.travel().await {
            return self.suspend();
        }

        let outcome = self.ship.landing_outcome();
        self.persister
            .flavor(&mut self.ship, &self.ctx.flavor, landing_flavor(outcome));

        if let Some(mut mission) = self.ship.conclude_mission(self.mission_completed) {
            mission.record(format!("Landed {}", outcome));
            self.persister.mission(&mission);
            self.ship.past_missions.push(mission);
        }
        self.ship.status = outcome;
        self.persister.ship(&self.ship);
        self.ctx.metrics.landed(outcome);

        info!(
            ship_id = %self.ship.id,
            status = %outcome,
            condition = self.ship.condition(),
            completed = self.mission_completed,
            "Ship landed"
        );
        TransitOutcome::Landed(outcome)
    }

    /// One travel leg in one-second steps.
    async fn travel(&mut self) -> Travel {
        let config = &self.ctx.config;

        for _ in 0..config.travel_steps() {
            if !pause(config.travel_step, &self.ctx.shutdown).await {
                return Travel::Shutdown;
            }
            if roll(config.degradation_probability) && self.ship.degrade() {
                self.persister.ship(&self.ship);
            }
            if roll(config.flavor.transit) {
                self.persister
                    .flavor(&mut self.ship, &self.ctx.flavor, FlavorCategory::TransitShip);
            }
            if self.abort.is_cancelled() && self.ship.status == ShipStatus::Outbound {
                return Travel::Aborted;
            }
        }
        Travel::Arrived
    }

    fn record_event(&mut self, description: impl Into<String>) {
        if let Some(mission) = self.ship.mission.as_mut() {
            mission.record(description);
            self.persister.mission(mission);
        }
    }

    fn suspend(self) -> TransitOutcome {
        self.persister.ship(&self.ship);
        debug!(ship_id = %self.ship.id, status = %self.ship.status, "Transit stopped by shutdown");
        TransitOutcome::Interrupted
    }
}
