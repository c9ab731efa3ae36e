//! Floating allocation integration tests

use enipam::cloud::fake::{CloudCall, CloudOp};
use enipam::common::{IpObjectFilter, IpStatus};
use enipam::ipam::{AllocateIpRequest, ReleaseIpRequest};
use enipam::store::IpamStore;
use enipam::{Allocator, FakeCloud, MemStore, ReleaseHandlers};
use std::sync::Arc;

fn fixture() -> (Arc<MemStore>, Arc<FakeCloud>, Allocator) {
    let store = Arc::new(MemStore::new());
    let cloud = Arc::new(FakeCloud::new());
    cloud.add_subnet("sbn-1", "10.0.0.0/24", "zoneA");
    cloud.add_eni("eni-1", "vpc-1", "gz", "sbn-1");
    let allocator = Allocator::new(store.clone(), cloud.clone());
    (store, cloud, allocator)
}

async fn register_subnet(store: &MemStore) {
    let ts = enipam::common::now();
    store
        .create_subnet(&enipam::common::CloudSubnet {
            subnet_id: "sbn-1".into(),
            vpc_id: "vpc-1".into(),
            region: "gz".into(),
            zone: "zoneA".into(),
            subnet_cidr: "10.0.0.0/24".into(),
            available_ip_num: 253,
            state: enipam::common::SubnetState::Enabled,
            create_time: ts,
            update_time: ts,
        })
        .await
        .unwrap();
}

fn request(pod: &str) -> AllocateIpRequest {
    AllocateIpRequest {
        subnet_id: "sbn-1".into(),
        vpc_id: "vpc-1".into(),
        region: "gz".into(),
        cluster: "c1".into(),
        host: "h1".into(),
        pod_name: pod.into(),
        namespace: "default".into(),
        workload_name: "web".into(),
        workload_kind: "Deployment".into(),
        container_id: "ctr-1".into(),
        eni_id: "eni-1".into(),
    }
}

#[tokio::test]
async fn fresh_allocation_assigns_exactly_once() {
    let (store, cloud, allocator) = fixture();
    register_subnet(&store).await;

    let obj = allocator.allocate(&request("p1")).await.unwrap();

    assert_eq!(obj.status, IpStatus::Active);
    assert!(!obj.is_fixed);
    assert_eq!(obj.subnet_cidr, "10.0.0.0/24");

    let assigns = cloud
        .calls()
        .iter()
        .filter(|c| matches!(c, CloudCall::AssignIp { .. }))
        .count();
    assert_eq!(assigns, 1);

    let all = store.list_ips(&IpObjectFilter::new()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn available_candidate_is_reused_without_cloud_calls() {
    let (store, cloud, allocator) = fixture();
    register_subnet(&store).await;

    // First pod allocates, then releases
    let obj = allocator.allocate(&request("p1")).await.unwrap();
    let releases = ReleaseHandlers::new(store.clone());
    releases
        .release(&ReleaseIpRequest {
            address: obj.address.clone(),
            vpc_id: "vpc-1".into(),
            region: "gz".into(),
            eni_id: "eni-1".into(),
            cluster: "c1".into(),
            namespace: "default".into(),
            pod_name: "p1".into(),
        })
        .await
        .unwrap();
    cloud.reset_calls();

    // Second pod on the same ENI gets the same address back
    let reused = allocator.allocate(&request("p2")).await.unwrap();
    assert_eq!(reused.address, obj.address);
    assert_eq!(reused.pod_name, "p2");
    assert_eq!(reused.status, IpStatus::Active);
    assert!(cloud.calls().is_empty(), "reuse path must not touch the provider");
}

#[tokio::test]
async fn disabled_subnet_refuses_allocation() {
    let (store, _cloud, allocator) = fixture();
    register_subnet(&store).await;
    let mut subnet = store.get_subnet("sbn-1").await.unwrap();
    subnet.state = enipam::common::SubnetState::Disabled;
    store.update_subnet(&subnet).await.unwrap();

    let err = allocator.allocate(&request("p1")).await.unwrap_err();
    assert_eq!(err.code(), 4001);
}

#[tokio::test]
async fn eni_attachment_mismatch_is_rejected() {
    let (store, cloud, allocator) = fixture();
    register_subnet(&store).await;
    // ENI actually attached elsewhere
    cloud.add_eni("eni-1", "vpc-other", "gz", "sbn-1");

    let err = allocator.allocate(&request("p1")).await.unwrap_err();
    assert_eq!(err.code(), 4002);
}

#[tokio::test]
async fn assign_failure_aborts_without_store_record() {
    let (store, cloud, allocator) = fixture();
    register_subnet(&store).await;
    cloud.fail_on(CloudOp::AssignIp);

    let err = allocator.allocate(&request("p1")).await.unwrap_err();
    assert_eq!(err.code(), 3003);
    assert!(store.list_ips(&IpObjectFilter::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_required_field_is_invalid_params() {
    let (_store, _cloud, allocator) = fixture();
    let mut req = request("p1");
    req.workload_name = String::new();
    let err = allocator.allocate(&req).await.unwrap_err();
    assert_eq!(err.code(), 1001);
}
