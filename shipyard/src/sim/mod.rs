//! The ship-lifecycle simulation.
//!
//! Two queue-driven schedulers and one task per ship in flight:
//!
//! ```text
//!                ┌──────────────────┐
//!  add_to_queue ─►  RepairScheduler │──► READY / BROKEN
//!                └──────────────────┘
//!                ┌──────────────────┐      ┌────────────────┐
//!  add_to_queue ─►  LaunchScheduler │──────►  TransitWorker │──► ACTIVE (peer)
//!                └────────┬─────────┘      └───────┬────────┘
//!                         │ aborted                │ aborted / peer down
//!                         ▼                        ▼
//!                 READY / BROKEN / CRASHED  READY / BROKEN / CRASHED
//! ```
//!
//! Ships move by value: the queue owns queued ships, each scheduler loop owns
//! its active ship, and each transit task owns its ship. Callers outside the
//! simulation address ships by [`ShipId`] only, so nothing else can mutate a
//! ship while a tick is running. Cancellation is cooperative through
//! [`CancellationToken`]s checked at tick boundaries.

mod drydock;
mod launch;
mod persist;
mod queue;
mod transit;

pub use drydock::RepairScheduler;
pub use launch::LaunchScheduler;
pub use transit::{Direction, TransitError, TransitOutcome, TransitRegistry};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::SimulationConfig;
use crate::flavor::{FlavorCategory, FlavorText};
use crate::model::{ShipId, ShipStatus};
use crate::telemetry::SimulationMetrics;

/// Errors surfaced by the schedulers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// `add_to_queue` was called before `initialize`.
    #[error("Scheduler has not been initialized")]
    NotInitialized,

    /// The ship is already queued, active or in flight.
    #[error("Ship {0} is already queued or active")]
    AlreadyQueued(ShipId),

    /// An active ship was found in a status its scheduler never assigns.
    #[error("{scheduler}: ship {ship} in unexpected status {status}")]
    StateViolation {
        scheduler: &'static str,
        ship: ShipId,
        status: ShipStatus,
    },
}

/// Everything the schedulers and workers share.
#[derive(Clone)]
pub struct SimContext {
    pub config: SimulationConfig,
    pub flavor: Arc<FlavorText>,
    pub metrics: Arc<SimulationMetrics>,
    /// Stops every loop and worker at its next sleep.
    pub shutdown: CancellationToken,
}

impl SimContext {
    /// Context with the bundled flavor text, fresh metrics and a new shutdown token.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            flavor: Arc::new(FlavorText::bundled().clone()),
            metrics: Arc::new(SimulationMetrics::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_flavor(mut self, flavor: Arc<FlavorText>) -> Self {
        self.flavor = flavor;
        self
    }
}

/// Sleeps for `duration`. Returns false if shutdown fired first.
async fn pause(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn roll(probability: f64) -> bool {
    use rand::Rng;
    probability > 0.0 && rand::rng().random_bool(probability.min(1.0))
}

/// Flavor category announcing a landing outcome.
fn landing_flavor(outcome: ShipStatus) -> FlavorCategory {
    match outcome {
        ShipStatus::Crashed => FlavorCategory::LandingCrashed,
        ShipStatus::Broken => FlavorCategory::LandingBroken,
        _ => FlavorCategory::Landing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_extremes() {
        assert!(!roll(0.0));
        assert!(roll(1.0));
    }

    #[test]
    fn test_landing_flavor_mapping() {
        assert_eq!(landing_flavor(ShipStatus::Crashed), FlavorCategory::LandingCrashed);
        assert_eq!(landing_flavor(ShipStatus::Broken), FlavorCategory::LandingBroken);
        assert_eq!(landing_flavor(ShipStatus::Ready), FlavorCategory::Landing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_on_shutdown() {
        let shutdown = CancellationToken::new();
        assert!(pause(Duration::from_secs(5), &shutdown).await);

        shutdown.cancel();
        assert!(!pause(Duration::from_secs(5), &shutdown).await);
    }

    #[test]
    fn test_state_violation_message() {
        let err = SchedulerError::StateViolation {
            scheduler: "drydock",
            ship: ShipId(4),
            status: ShipStatus::Outbound,
        };
        assert_eq!(
            err.to_string(),
            "drydock: ship 4 in unexpected status OUTBOUND"
        );
    }
}
