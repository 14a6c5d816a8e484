//! Fleet-level orchestration and auto-sync behavior.

mod support;

use std::sync::Arc;
use std::time::Duration;

use credsync_connector::{DeviceId, DeviceUser};
use credsync_engine::{AutoSyncRegistry, ReconcileEngine, SyncOrchestrator};
use credsync_store::{
    AssignmentRepository, CardAssignment, CardType, EnrollmentStatus, MemoryAssignmentStore,
};

use support::MockFleet;

struct Harness {
    store: Arc<MemoryAssignmentStore>,
    fleet: Arc<MockFleet>,
    engine: Arc<ReconcileEngine>,
    orchestrator: SyncOrchestrator,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryAssignmentStore::new());
        let fleet = MockFleet::new();
        let engine = Arc::new(ReconcileEngine::new(store.clone(), fleet.clone()));
        let orchestrator =
            SyncOrchestrator::new(engine.clone(), store.clone(), fleet.clone());
        Self {
            store,
            fleet,
            engine,
            orchestrator,
        }
    }

    async fn create(&self, employee: &str, card: &str) -> CardAssignment {
        self.store
            .create_assignment(CardAssignment::new(employee, card, CardType::Csn))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn sync_all_covers_every_connected_device() {
    let h = Harness::new();
    let alpha = DeviceId::new();
    let beta = DeviceId::new();
    h.fleet.register(alpha);
    h.fleet.register(beta);

    h.create("emp1", "AABBCC").await;

    let fleet = h.orchestrator.sync_all().await.unwrap();

    assert_eq!(fleet.statistics.devices_total, 2);
    assert_eq!(fleet.statistics.devices_succeeded, 2);
    assert_eq!(fleet.statistics.users_added, 2);
    assert!(fleet.all_devices_succeeded());
    assert!(h.fleet.has_user(alpha, "emp1"));
    assert!(h.fleet.has_user(beta, "emp1"));
}

#[tokio::test]
async fn unavailable_device_does_not_block_the_fleet() {
    let h = Harness::new();
    let healthy = DeviceId::new();
    let broken = DeviceId::new();
    h.fleet.register(healthy);
    h.fleet.register(broken);
    h.fleet.set_unavailable(broken);

    h.create("emp1", "AABBCC").await;

    let fleet = h.orchestrator.sync_all().await.unwrap();

    assert_eq!(fleet.statistics.devices_total, 2);
    assert_eq!(fleet.statistics.devices_succeeded, 1);
    assert_eq!(fleet.statistics.devices_failed, 1);
    assert!(!fleet.all_devices_succeeded());
    assert!(h.fleet.has_user(healthy, "emp1"));

    let failure = fleet
        .outcomes
        .iter()
        .find(|outcome| !outcome.success)
        .unwrap();
    assert_eq!(failure.device_id, broken);
    assert!(failure.error.as_deref().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn sync_assignment_touches_only_enrolled_devices() {
    let h = Harness::new();
    let enrolled = DeviceId::new();
    let untouched = DeviceId::new();
    h.fleet.register(enrolled);
    h.fleet.register(untouched);

    let assignment = h.create("emp1", "AABBCC").await;
    h.store
        .upsert_enrollment(enrolled, assignment.id, "emp1", EnrollmentStatus::Active)
        .await
        .unwrap();
    h.fleet
        .seed_user(enrolled, DeviceUser::with_card("emp1", "445566"));

    let fleet = h.orchestrator.sync_assignment(assignment.id).await.unwrap();

    assert_eq!(fleet.statistics.devices_total, 1);
    assert_eq!(fleet.statistics.users_updated, 1);
    assert_eq!(h.fleet.card_of(enrolled, "emp1").as_deref(), Some("AABBCC"));
    // The targeted sync never reached the other device.
    assert!(!h.fleet.has_user(untouched, "emp1"));
}

#[tokio::test(start_paused = true)]
async fn auto_sync_converges_and_stops() {
    let h = Harness::new();
    let device = DeviceId::new();
    h.fleet.register(device);
    h.create("emp1", "AABBCC").await;

    let registry = AutoSyncRegistry::new(h.engine.clone());
    registry.start(device, Duration::from_secs(60));

    // First tick fires immediately.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.fleet.has_user(device, "emp1"));
    assert!(registry.is_running(device));

    assert!(registry.stop(device));
    assert!(!registry.stop(device));
    assert!(!registry.is_running(device));
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn auto_sync_restart_replaces_the_existing_timer() {
    let h = Harness::new();
    let device = DeviceId::new();
    h.fleet.register(device);

    let registry = AutoSyncRegistry::new(h.engine.clone());
    registry.start(device, Duration::from_secs(60));
    registry.start(device, Duration::from_secs(30));

    assert_eq!(registry.len(), 1);
    assert!(registry.stop(device));
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn auto_sync_heals_drift_on_later_ticks() {
    let h = Harness::new();
    let device = DeviceId::new();
    h.fleet.register(device);
    h.create("emp1", "AABBCC").await;

    let registry = AutoSyncRegistry::new(h.engine.clone());
    registry.start(device, Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.fleet.has_user(device, "emp1"));

    // Someone deletes the user out-of-band; the next tick restores it.
    h.fleet.delete_direct(device, "emp1");
    assert!(!h.fleet.has_user(device, "emp1"));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(h.fleet.has_user(device, "emp1"));

    registry.shutdown();
}
