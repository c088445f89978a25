//! Simulation telemetry.
//!
//! Lock-free counters shared by the schedulers and transit workers, plus a
//! point-in-time [`MetricsSnapshot`] for display.
//!
//! ```text
//! Schedulers / Workers ─────► SimulationMetrics ─────► MetricsSnapshot ─────► CLI
//!                             (atomic counters)        (plain copy)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::ShipStatus;

/// Atomic counters for simulation events.
#[derive(Debug, Default)]
pub struct SimulationMetrics {
    repairs_completed: AtomicU64,
    repairs_interrupted: AtomicU64,
    launches: AtomicU64,
    launch_aborts: AtomicU64,
    deliveries_succeeded: AtomicU64,
    delivery_attempts_failed: AtomicU64,
    landings_ready: AtomicU64,
    landings_broken: AtomicU64,
    landings_crashed: AtomicU64,
    persistence_failures: AtomicU64,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A drydock cycle finished; `interrupted` if it stopped short of peak.
    pub fn repair_finished(&self, interrupted: bool) {
        if interrupted {
            self.repairs_interrupted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.repairs_completed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn launched(&self) {
        self.launches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn launch_aborted(&self) {
        self.launch_aborts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivery_succeeded(&self) {
        self.deliveries_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivery_attempt_failed(&self) {
        self.delivery_attempts_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a landing by its outcome. Non-terminal statuses are ignored.
    pub fn landed(&self, outcome: ShipStatus) {
        let counter = match outcome {
            ShipStatus::Ready => &self.landings_ready,
            ShipStatus::Broken => &self.landings_broken,
            ShipStatus::Crashed => &self.landings_crashed,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn persistence_failed(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            repairs_completed: self.repairs_completed.load(Ordering::Relaxed),
            repairs_interrupted: self.repairs_interrupted.load(Ordering::Relaxed),
            launches: self.launches.load(Ordering::Relaxed),
            launch_aborts: self.launch_aborts.load(Ordering::Relaxed),
            deliveries_succeeded: self.deliveries_succeeded.load(Ordering::Relaxed),
            delivery_attempts_failed: self.delivery_attempts_failed.load(Ordering::Relaxed),
            landings_ready: self.landings_ready.load(Ordering::Relaxed),
            landings_broken: self.landings_broken.load(Ordering::Relaxed),
            landings_crashed: self.landings_crashed.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SimulationMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub repairs_completed: u64,
    pub repairs_interrupted: u64,
    pub launches: u64,
    pub launch_aborts: u64,
    pub deliveries_succeeded: u64,
    pub delivery_attempts_failed: u64,
    pub landings_ready: u64,
    pub landings_broken: u64,
    pub landings_crashed: u64,
    pub persistence_failures: u64,
}

impl MetricsSnapshot {
    /// Total landings across all outcomes.
    pub fn landings(&self) -> u64 {
        self.landings_ready + self.landings_broken + self.landings_crashed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = SimulationMetrics::new();
        metrics.repair_finished(false);
        metrics.repair_finished(true);
        metrics.launched();
        metrics.delivery_attempt_failed();
        metrics.delivery_attempt_failed();
        metrics.persistence_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.repairs_completed, 1);
        assert_eq!(snapshot.repairs_interrupted, 1);
        assert_eq!(snapshot.launches, 1);
        assert_eq!(snapshot.delivery_attempts_failed, 2);
        assert_eq!(snapshot.persistence_failures, 1);
    }

    #[test]
    fn test_landed_by_outcome() {
        let metrics = SimulationMetrics::new();
        metrics.landed(ShipStatus::Ready);
        metrics.landed(ShipStatus::Crashed);
        metrics.landed(ShipStatus::Crashed);
        metrics.landed(ShipStatus::Outbound);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.landings_ready, 1);
        assert_eq!(snapshot.landings_crashed, 2);
        assert_eq!(snapshot.landings(), 3);
    }
}
