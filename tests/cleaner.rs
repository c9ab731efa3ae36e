//! Idle-cleaner and node-cleaner integration tests

use enipam::cloud::fake::{CloudCall, CloudOp};
use enipam::common::{now, IpObject, IpamConfig, IpStatus};
use enipam::ipam::CleanNodeRequest;
use enipam::store::IpamStore;
use enipam::{CloudProvider, FakeCloud, IdleCleaner, LeaderGate, MemStore, NodeCleaner, StaticGate};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;

fn config() -> IpamConfig {
    IpamConfig {
        cluster: "c1".into(),
        max_idle_secs: 60,
        cleaner_interval_secs: 1,
        evict_settle_ms: 0,
        reclaim_pause_ms: 0,
    }
}

async fn seed(
    store: &MemStore,
    address: &str,
    status: IpStatus,
    is_fixed: bool,
    idle_secs: i64,
) -> IpObject {
    let ts = now() - ChronoDuration::seconds(idle_secs);
    let obj = IpObject {
        address: address.into(),
        vpc_id: "vpc-1".into(),
        region: "gz".into(),
        subnet_id: "sbn-1".into(),
        subnet_cidr: "10.0.0.0/24".into(),
        cluster: "c1".into(),
        namespace: "default".into(),
        pod_name: "p1".into(),
        workload_name: "web".into(),
        workload_kind: "Deployment".into(),
        container_id: String::new(),
        host: "h1".into(),
        eni_id: "eni-1".into(),
        is_fixed,
        status,
        resource_version: 0,
        create_time: ts,
        update_time: ts,
        keep_duration: 0,
    };
    store.create_ip(&obj).await.unwrap()
}

#[tokio::test]
async fn idle_object_goes_deleting_then_unassign_then_delete() {
    let store = Arc::new(MemStore::new());
    let cloud = Arc::new(FakeCloud::new());
    seed(&store, "10.0.0.2", IpStatus::Available, false, 3600).await;

    // Arm the provider to fail so the sweep stops between the status write
    // and the store delete: proves Deleting is written before the cloud call.
    cloud.fail_on(CloudOp::UnassignIp);
    let cleaner = IdleCleaner::new(
        store.clone(),
        cloud.clone(),
        StaticGate::new(true),
        config(),
    );
    cleaner.sweep().await.unwrap();

    let parked = store.get_ip("10.0.0.2").await.unwrap();
    assert_eq!(parked.status, IpStatus::Deleting);
    // Pass 2 of the same sweep already retried the teardown once, so the
    // provider saw the unassign at least once and nothing else.
    assert!(!cloud.calls().is_empty());
    assert!(cloud.calls().iter().all(|c| matches!(
        c,
        CloudCall::UnassignIp { address, eni_id } if address == "10.0.0.2" && eni_id == "eni-1"
    )));

    // Provider recovers: repair pass re-drives unassign then delete.
    cloud.clear_failures();
    cloud.reset_calls();
    cleaner.sweep().await.unwrap();

    assert!(store.get_ip("10.0.0.2").await.is_err());
    assert_eq!(
        cloud.calls(),
        vec![CloudCall::UnassignIp {
            address: "10.0.0.2".into(),
            eni_id: "eni-1".into()
        }]
    );
}

#[tokio::test]
async fn teardown_rerun_after_successful_unassign_converges() {
    let store = Arc::new(MemStore::new());
    let cloud = Arc::new(FakeCloud::new());
    cloud.add_subnet("sbn-1", "10.0.0.0/24", "zoneA");
    cloud.add_eni("eni-1", "vpc-1", "gz", "sbn-1");

    // Address was assigned, unassigned provider-side, but the crash happened
    // before the store delete: object stuck in Deleting.
    let addr = cloud.assign_ip("", "eni-1").await.unwrap();
    cloud.unassign_ip(&addr, "eni-1").await.unwrap();
    seed(&store, &addr, IpStatus::Deleting, false, 10).await;

    let cleaner = IdleCleaner::new(
        store.clone(),
        cloud.clone(),
        StaticGate::new(true),
        config(),
    );
    let report = cleaner.sweep().await.unwrap();

    // Second unassign of an already-unassigned address must not error
    assert_eq!(report.repaired, 1);
    assert_eq!(report.failed, 0);
    assert!(store.get_ip(&addr).await.is_err());
}

#[tokio::test]
async fn non_leader_replica_skips_the_sweep() {
    let store = Arc::new(MemStore::new());
    let cloud = Arc::new(FakeCloud::new());
    seed(&store, "10.0.0.2", IpStatus::Available, false, 3600).await;

    let gate = StaticGate::new(false);
    let cleaner = IdleCleaner::new(store.clone(), cloud.clone(), gate.clone(), config());

    // The loop checks the gate each tick; model one gated tick directly.
    if gate.is_leader() {
        cleaner.sweep().await.unwrap();
    }
    assert!(store.get_ip("10.0.0.2").await.is_ok());
    assert!(cloud.calls().is_empty());

    // Leadership acquired: next tick sweeps.
    gate.set_leader(true);
    if gate.is_leader() {
        cleaner.sweep().await.unwrap();
    }
    assert!(store.get_ip("10.0.0.2").await.is_err());
}

#[tokio::test]
async fn fixed_and_fresh_objects_survive_the_sweep() {
    let store = Arc::new(MemStore::new());
    let cloud = Arc::new(FakeCloud::new());
    seed(&store, "10.0.0.2", IpStatus::Available, true, 3600).await; // fixed
    seed(&store, "10.0.0.3", IpStatus::Available, false, 5).await; // young
    seed(&store, "10.0.0.4", IpStatus::Active, false, 3600).await; // live

    let cleaner = IdleCleaner::new(store.clone(), cloud, StaticGate::new(true), config());
    let report = cleaner.sweep().await.unwrap();

    assert_eq!(report.reclaimed, 0);
    assert!(store.get_ip("10.0.0.2").await.is_ok());
    assert!(store.get_ip("10.0.0.3").await.is_ok());
    assert!(store.get_ip("10.0.0.4").await.is_ok());
}

#[tokio::test]
async fn forced_node_clean_tears_down_everything_on_host() {
    let store = Arc::new(MemStore::new());
    let cloud = Arc::new(FakeCloud::new());
    seed(&store, "10.0.0.2", IpStatus::Active, true, 0).await;
    seed(&store, "10.0.0.3", IpStatus::Available, false, 0).await;

    let cleaner = NodeCleaner::new(store.clone(), cloud.clone());
    let report = cleaner
        .clean_node(&CleanNodeRequest {
            cluster: "c1".into(),
            host: "h1".into(),
            force: true,
        })
        .await
        .unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.cleaned, 2);
    // Each candidate saw exactly one unassign before its delete
    let unassigns = cloud
        .calls()
        .iter()
        .filter(|c| matches!(c, CloudCall::UnassignIp { .. }))
        .count();
    assert_eq!(unassigns, 2);
}
