//! Integration tests driving whole ship lifecycles through the facade.
//!
//! Time is paused, so each test simulates several minutes instantly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shipyard::model::{Coordinates, Mission, MissionId, Objective, Ship, ShipId, ShipStatus};
use shipyard::{MemoryStore, PeerClient, PeerError, Shipyard, SimContext, SimulationConfig};

/// Peer that records which ships it was offered.
struct RecordingPeer {
    accept: bool,
    offered: Mutex<Vec<ShipId>>,
}

impl RecordingPeer {
    fn new(accept: bool) -> Arc<Self> {
        Arc::new(Self {
            accept,
            offered: Mutex::new(Vec::new()),
        })
    }

    fn offered(&self) -> Vec<ShipId> {
        self.offered.lock().clone()
    }
}

impl PeerClient for RecordingPeer {
    fn deliver<'a>(
        &'a self,
        ship: &'a Ship,
    ) -> Pin<Box<dyn Future<Output = Result<(), PeerError>> + Send + 'a>> {
        self.offered.lock().push(ship.id);
        let result = if self.accept {
            Ok(())
        } else {
            Err(PeerError::Request("connection refused".to_string()))
        };
        Box::pin(async move { result })
    }
}

fn steady() -> SimulationConfig {
    SimulationConfig::default()
        .with_flavor_probability(0.0)
        .with_degradation_probability(0.0)
}

fn start(peer: Arc<RecordingPeer>) -> (Shipyard, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let yard = Shipyard::with_peer(SimContext::new(steady()), store.clone(), peer);
    (yard, store)
}

fn survey(id: u64) -> Mission {
    Mission::new(MissionId(id), Objective::Survey, "Belt survey")
        .with_description("Map the inner belt")
        .with_volume(Coordinates::new(120.0, -4.5, 30.0), 25.0)
}

#[tokio::test(start_paused = true)]
async fn test_repair_then_launch_then_deliver() {
    let peer = RecordingPeer::new(true);
    let (yard, store) = start(peer.clone());

    let damaged = Ship::new(ShipId(1), "Albatross", 5, 10).unwrap();
    assert_eq!(yard.repair(damaged).unwrap(), 1);

    tokio::time::sleep(Duration::from_secs(120)).await;
    let repaired = store.ship(ShipId(1)).unwrap();
    assert_eq!(repaired.status, ShipStatus::Ready);
    assert_eq!(repaired.condition(), 10);

    yard.launch(repaired.with_mission(survey(1))).unwrap();
    tokio::time::sleep(Duration::from_secs(300)).await;

    let delivered = store.ship(ShipId(1)).unwrap();
    assert_eq!(delivered.status, ShipStatus::Active);
    assert_eq!(peer.offered(), vec![ShipId(1)]);

    let mission = store.mission(MissionId(1)).unwrap();
    assert!(mission.departure_time.is_some());
    assert!(mission.arrival_time.is_none());

    let metrics = yard.metrics();
    assert_eq!(metrics.repairs_completed, 1);
    assert_eq!(metrics.launches, 1);
    assert_eq!(metrics.deliveries_succeeded, 1);
    yard.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_delivered_ship_comes_home() {
    let (yard, store) = start(RecordingPeer::new(true));

    let ship = Ship::new(ShipId(2), "Petrel", 40, 100)
        .unwrap()
        .with_mission(survey(2));
    yard.launch(ship).unwrap();
    tokio::time::sleep(Duration::from_secs(300)).await;

    let away = store.ship(ShipId(2)).unwrap();
    assert_eq!(away.status, ShipStatus::Active);

    yard.receive(away).unwrap();
    tokio::time::sleep(Duration::from_secs(200)).await;

    let home = store.ship(ShipId(2)).unwrap();
    assert_eq!(home.status, ShipStatus::Ready);
    assert!(home.mission.is_none());
    assert_eq!(home.past_missions.len(), 1);
    assert!(home.past_missions[0].completed);
    assert!(home.past_missions[0].arrival_time.is_some());
    yard.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_peer_returns_ship() {
    let peer = RecordingPeer::new(false);
    let (yard, store) = start(peer.clone());

    // 8 of 100 is under the 10% threshold.
    let ship = Ship::new(ShipId(3), "Tern", 8, 100)
        .unwrap()
        .with_mission(survey(3));
    yard.launch(ship).unwrap();
    tokio::time::sleep(Duration::from_secs(600)).await;

    let landed = store.ship(ShipId(3)).unwrap();
    assert_eq!(landed.status, ShipStatus::Broken);
    assert_eq!(peer.offered().len(), 5);

    let metrics = yard.metrics();
    assert_eq!(metrics.delivery_attempts_failed, 5);
    assert_eq!(metrics.landings_broken, 1);
    yard.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_fleet_launches_one_at_a_time() {
    let peer = RecordingPeer::new(true);
    let (yard, store) = start(peer.clone());

    for id in 1..=3 {
        let ship = Ship::new(ShipId(id), format!("Gull {}", id), 50, 100)
            .unwrap()
            .with_mission(survey(id));
        assert_eq!(yard.launch(ship).unwrap(), id as usize);
    }

    // Only the head is on the pad; the others keep their places.
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(store.ship(ShipId(1)).unwrap().status, ShipStatus::TakingOff);
    assert_eq!(
        store.ship(ShipId(3)).unwrap().status.to_string(),
        "AWAITING_TAKEOFF (2)"
    );

    tokio::time::sleep(Duration::from_secs(600)).await;
    for id in 1..=3 {
        assert_eq!(store.ship(ShipId(id)).unwrap().status, ShipStatus::Active);
    }
    assert_eq!(peer.offered(), vec![ShipId(1), ShipId(2), ShipId(3)]);
    yard.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_abort_all_missions() {
    let (yard, store) = start(RecordingPeer::new(true));

    for id in 1..=2 {
        let ship = Ship::new(ShipId(id), format!("Skua {}", id), 50, 100)
            .unwrap()
            .with_mission(survey(id));
        yard.launch(ship).unwrap();
    }

    // Ship 1 is outbound and ship 2 is on the pad.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(yard.abort_all_missions(), 2);

    tokio::time::sleep(Duration::from_secs(400)).await;
    for id in 1..=2 {
        let ship = store.ship(ShipId(id)).unwrap();
        assert_eq!(ship.status, ShipStatus::Ready);
        assert!(ship.mission.is_none());
        assert!(!store.mission(MissionId(id)).unwrap().completed);
    }
    assert_eq!(yard.metrics().deliveries_succeeded, 0);
    yard.shutdown().await.unwrap();
}
