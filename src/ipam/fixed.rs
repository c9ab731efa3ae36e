//! Fixed (sticky) IP allocation
//!
//! A fixed address is bound to a (namespace, pod) identity and follows the
//! pod across ENIs. Four outcomes, decided in order:
//!
//! 1. existing allocation on the requested ENI -> rebind in place
//! 2. existing allocation elsewhere -> evict a victim on the target ENI if
//!    one exists, migrate the address provider-side, rebind
//! 3. no existing allocation but an Available floating address on the target
//!    ENI -> promote it to fixed (no provider call)
//! 4. nothing reusable -> assign a fresh address, create the object fixed
//!
//! Victim selection is uniformly random over qualifying objects; concurrent
//! allocators racing for the same victim are resolved by the store's
//! compare-and-swap, not by locking.

use crate::cloud::CloudProvider;
use crate::common::{now, Error, IpObject, IpObjectFilter, IpStatus, Result};
use crate::ipam::{require, AllocateFixedIpRequest};
use crate::store::IpamStore;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct FixedAllocator {
    store: Arc<dyn IpamStore>,
    cloud: Arc<dyn CloudProvider>,
    /// Injected once at construction; no ambient RNG state.
    rng: Mutex<StdRng>,
    /// Empirical pause between victim eviction and the migrate call, giving
    /// the provider time to observe the unassign.
    settle_delay: Duration,
}

impl FixedAllocator {
    pub fn new(
        store: Arc<dyn IpamStore>,
        cloud: Arc<dyn CloudProvider>,
        rng: StdRng,
        settle_delay: Duration,
    ) -> Self {
        Self {
            store,
            cloud,
            rng: Mutex::new(rng),
            settle_delay,
        }
    }

    pub async fn allocate_fixed(&self, req: &AllocateFixedIpRequest) -> Result<IpObject> {
        validate(req)?;

        match self.resolve_existing(req).await? {
            Some(existing) if existing.status == IpStatus::Active => {
                // Dirty data: someone still holds this address live.
                Err(Error::AddressActive(existing.address))
            }
            Some(existing) if existing.eni_id == req.eni_id => {
                tracing::info!(
                    address = %existing.address,
                    pod = %req.pod_name,
                    "rebinding fixed address on same ENI"
                );
                self.rebind(existing, req).await
            }
            Some(existing) => self.migrate(existing, req).await,
            None => match self.find_victim(&req.eni_id, &req.cluster).await? {
                Some(victim) => {
                    tracing::info!(
                        address = %victim.address,
                        pod = %req.pod_name,
                        "promoting floating address to fixed"
                    );
                    self.promote(victim, req).await
                }
                None => self.fresh(req).await,
            },
        }
    }

    /// Find the pod's current fixed allocation, either by the caller-named
    /// address or by scanning the (cluster, subnet) fixed pool.
    async fn resolve_existing(&self, req: &AllocateFixedIpRequest) -> Result<Option<IpObject>> {
        if !req.address.is_empty() {
            let obj = match self.store.get_ip(&req.address).await {
                Ok(obj) => obj,
                // Unknown address: fall through to fresh allocation, which
                // will request this exact address from the provider.
                Err(Error::NotFound(_)) => return Ok(None),
                Err(e) => return Err(e),
            };
            if !obj.is_fixed {
                return Err(Error::NotFixed(obj.address));
            }
            let owned = obj.vpc_id == req.vpc_id
                && obj.region == req.region
                && obj.subnet_id == req.subnet_id
                && obj.cluster == req.cluster
                && obj.namespace == req.namespace
                && obj.pod_name == req.pod_name
                && obj.workload_name == req.workload_name;
            if !owned {
                return Err(Error::OwnershipMismatch {
                    address: obj.address,
                    reason: format!(
                        "requested by pod {}/{} of workload {}",
                        req.namespace, req.pod_name, req.workload_name
                    ),
                });
            }
            return Ok(Some(obj));
        }

        let filter = IpObjectFilter::new()
            .cluster(req.cluster.clone())
            .subnet_id(req.subnet_id.clone())
            .is_fixed(true);
        let fixed = self.store.list_ips(&filter).await?;
        Ok(fixed
            .into_iter()
            .find(|o| o.namespace == req.namespace && o.pod_name == req.pod_name))
    }

    /// Any Available floating address on the target ENI, chosen uniformly at
    /// random when several qualify.
    async fn find_victim(&self, eni_id: &str, cluster: &str) -> Result<Option<IpObject>> {
        let filter = IpObjectFilter::new()
            .status(IpStatus::Available)
            .is_fixed(false)
            .eni_id(eni_id.to_string())
            .cluster(cluster.to_string());
        let candidates = self.store.list_ips(&filter).await?;
        let mut rng = self.rng.lock().unwrap();
        Ok(candidates.choose(&mut *rng).cloned())
    }

    /// Existing allocation on a different ENI: free capacity on the target if
    /// a victim exists, then move the address provider-side and rebind.
    async fn migrate(&self, existing: IpObject, req: &AllocateFixedIpRequest) -> Result<IpObject> {
        let from_eni = existing.eni_id.clone();

        if let Some(victim) = self.find_victim(&req.eni_id, &req.cluster).await? {
            tracing::info!(
                victim = %victim.address,
                eni = %req.eni_id,
                "evicting floating address to make room for migration"
            );
            self.evict(victim).await?;
            tokio::time::sleep(self.settle_delay).await;
        }

        self.cloud
            .migrate_ip(&existing.address, &from_eni, &req.eni_id)
            .await?;
        tracing::info!(
            address = %existing.address,
            from = %from_eni,
            to = %req.eni_id,
            pod = %req.pod_name,
            "migrated fixed address"
        );

        self.rebind(existing, req).await
    }

    /// Teardown of a victim: park it in Deleting first so a crash between the
    /// provider call and the store delete is repairable by the idle cleaner.
    async fn evict(&self, mut victim: IpObject) -> Result<()> {
        victim.status = IpStatus::Deleting;
        victim.update_time = now();
        let victim = self.store.update_ip(&victim).await?;
        self.cloud
            .unassign_ip(&victim.address, &victim.eni_id)
            .await?;
        self.store.delete_ip(&victim.address).await
    }

    async fn rebind(&self, mut obj: IpObject, req: &AllocateFixedIpRequest) -> Result<IpObject> {
        obj.eni_id = req.eni_id.clone();
        obj.host = req.host.clone();
        obj.namespace = req.namespace.clone();
        obj.pod_name = req.pod_name.clone();
        obj.workload_name = req.workload_name.clone();
        obj.workload_kind = req.workload_kind.clone();
        obj.container_id = req.container_id.clone();
        obj.status = IpStatus::Active;
        obj.update_time = now();
        if req.keep_duration > 0 {
            obj.keep_duration = req.keep_duration;
        }
        self.store.update_ip(&obj).await
    }

    /// Promotion flips is_fixed false -> true; the only place that happens.
    async fn promote(&self, mut victim: IpObject, req: &AllocateFixedIpRequest) -> Result<IpObject> {
        victim.is_fixed = true;
        self.rebind(victim, req).await
    }

    async fn fresh(&self, req: &AllocateFixedIpRequest) -> Result<IpObject> {
        let subnet = self.store.get_subnet(&req.subnet_id).await?;
        if !subnet.is_enabled() {
            return Err(Error::SubnetDisabled(req.subnet_id.clone()));
        }

        let eni = self.cloud.query_eni(&req.eni_id).await?;
        if eni.vpc_id != req.vpc_id || eni.region != req.region || eni.subnet_id != req.subnet_id {
            return Err(Error::EniMismatch {
                eni_id: req.eni_id.clone(),
                reason: format!(
                    "attached to ({}, {}, {}), request claims ({}, {}, {})",
                    eni.vpc_id, eni.region, eni.subnet_id, req.vpc_id, req.region, req.subnet_id
                ),
            });
        }

        let address = self.cloud.assign_ip(&req.address, &req.eni_id).await?;
        // Point of no return, same non-transactional gap as floating allocate.
        let ts = now();
        let obj = IpObject {
            address,
            vpc_id: req.vpc_id.clone(),
            region: req.region.clone(),
            subnet_id: req.subnet_id.clone(),
            subnet_cidr: subnet.subnet_cidr.clone(),
            cluster: req.cluster.clone(),
            namespace: req.namespace.clone(),
            pod_name: req.pod_name.clone(),
            workload_name: req.workload_name.clone(),
            workload_kind: req.workload_kind.clone(),
            container_id: req.container_id.clone(),
            host: req.host.clone(),
            eni_id: req.eni_id.clone(),
            is_fixed: true,
            status: IpStatus::Active,
            resource_version: 0,
            create_time: ts,
            update_time: ts,
            keep_duration: req.keep_duration,
        };
        let obj = self.store.create_ip(&obj).await?;
        tracing::info!(
            address = %obj.address,
            eni = %req.eni_id,
            pod = %req.pod_name,
            "assigned new fixed address"
        );
        Ok(obj)
    }
}

fn validate(req: &AllocateFixedIpRequest) -> Result<()> {
    require("subnet_id", &req.subnet_id)?;
    require("vpc_id", &req.vpc_id)?;
    require("region", &req.region)?;
    require("cluster", &req.cluster)?;
    require("host", &req.host)?;
    require("pod_name", &req.pod_name)?;
    require("namespace", &req.namespace)?;
    require("workload_name", &req.workload_name)?;
    require("workload_kind", &req.workload_kind)?;
    require("eni_id", &req.eni_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::FakeCloud;
    use crate::store::MemStore;
    use rand::SeedableRng;

    fn allocator(store: Arc<MemStore>, cloud: Arc<FakeCloud>) -> FixedAllocator {
        FixedAllocator::new(
            store,
            cloud,
            StdRng::seed_from_u64(7),
            Duration::from_millis(0),
        )
    }

    fn request() -> AllocateFixedIpRequest {
        AllocateFixedIpRequest {
            address: String::new(),
            subnet_id: "sbn-1".into(),
            vpc_id: "vpc-1".into(),
            region: "gz".into(),
            cluster: "c1".into(),
            host: "h1".into(),
            pod_name: "p1".into(),
            namespace: "default".into(),
            workload_name: "web".into(),
            workload_kind: "StatefulSet".into(),
            container_id: "ctr-1".into(),
            eni_id: "eni-1".into(),
            keep_duration: 0,
        }
    }

    #[test]
    fn test_validate_rejects_missing_field() {
        let mut req = request();
        req.workload_kind = String::new();
        assert_eq!(validate(&req).unwrap_err().code(), 1001);
    }

    #[tokio::test]
    async fn test_explicit_address_with_wrong_owner_is_rejected() {
        let store = Arc::new(MemStore::new());
        let cloud = Arc::new(FakeCloud::new());

        let mut obj = crate::common::IpObject {
            address: "10.0.0.9".into(),
            vpc_id: "vpc-1".into(),
            region: "gz".into(),
            subnet_id: "sbn-1".into(),
            subnet_cidr: "10.0.0.0/24".into(),
            cluster: "c1".into(),
            namespace: "default".into(),
            pod_name: "someone-else".into(),
            workload_name: "web".into(),
            workload_kind: "StatefulSet".into(),
            container_id: String::new(),
            host: "h1".into(),
            eni_id: "eni-1".into(),
            is_fixed: true,
            status: IpStatus::Available,
            resource_version: 0,
            create_time: now(),
            update_time: now(),
            keep_duration: 0,
        };
        obj = store.create_ip(&obj).await.unwrap();

        let fixed = allocator(store, cloud);
        let mut req = request();
        req.address = obj.address.clone();
        let err = fixed.allocate_fixed(&req).await.unwrap_err();
        assert!(matches!(err, Error::OwnershipMismatch { .. }));
    }

    #[tokio::test]
    async fn test_explicit_address_on_floating_object_is_rejected() {
        let store = Arc::new(MemStore::new());
        let cloud = Arc::new(FakeCloud::new());

        let mut obj = crate::common::IpObject {
            address: "10.0.0.9".into(),
            vpc_id: "vpc-1".into(),
            region: "gz".into(),
            subnet_id: "sbn-1".into(),
            subnet_cidr: "10.0.0.0/24".into(),
            cluster: "c1".into(),
            namespace: "default".into(),
            pod_name: "p1".into(),
            workload_name: "web".into(),
            workload_kind: "StatefulSet".into(),
            container_id: String::new(),
            host: "h1".into(),
            eni_id: "eni-1".into(),
            is_fixed: false,
            status: IpStatus::Available,
            resource_version: 0,
            create_time: now(),
            update_time: now(),
            keep_duration: 0,
        };
        obj = store.create_ip(&obj).await.unwrap();

        let fixed = allocator(store, cloud);
        let mut req = request();
        req.address = obj.address.clone();
        assert!(matches!(
            fixed.allocate_fixed(&req).await,
            Err(Error::NotFixed(_))
        ));
    }

    #[tokio::test]
    async fn test_active_existing_allocation_is_dirty_data() {
        let store = Arc::new(MemStore::new());
        let cloud = Arc::new(FakeCloud::new());

        let obj = crate::common::IpObject {
            address: "10.0.0.9".into(),
            vpc_id: "vpc-1".into(),
            region: "gz".into(),
            subnet_id: "sbn-1".into(),
            subnet_cidr: "10.0.0.0/24".into(),
            cluster: "c1".into(),
            namespace: "default".into(),
            pod_name: "p1".into(),
            workload_name: "web".into(),
            workload_kind: "StatefulSet".into(),
            container_id: String::new(),
            host: "h1".into(),
            eni_id: "eni-1".into(),
            is_fixed: true,
            status: IpStatus::Active,
            resource_version: 0,
            create_time: now(),
            update_time: now(),
            keep_duration: 0,
        };
        store.create_ip(&obj).await.unwrap();

        let fixed = allocator(store, cloud);
        assert!(matches!(
            fixed.allocate_fixed(&request()).await,
            Err(Error::AddressActive(_))
        ));
    }
}
