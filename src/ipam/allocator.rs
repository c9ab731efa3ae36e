//! Floating-IP allocation
//!
//! Reuse an Available floating address already sitting on the requested ENI
//! if one exists (no provider call), otherwise validate subnet and ENI
//! attachment and assign a fresh secondary address.

use crate::cloud::CloudProvider;
use crate::common::{now, CloudSubnet, Error, IpObject, IpObjectFilter, IpStatus, Result};
use crate::ipam::{require, AllocateIpRequest};
use crate::store::IpamStore;
use std::sync::Arc;

pub struct Allocator {
    store: Arc<dyn IpamStore>,
    cloud: Arc<dyn CloudProvider>,
}

impl Allocator {
    pub fn new(store: Arc<dyn IpamStore>, cloud: Arc<dyn CloudProvider>) -> Self {
        Self { store, cloud }
    }

    pub async fn allocate(&self, req: &AllocateIpRequest) -> Result<IpObject> {
        validate(req)?;

        if let Some(candidate) = self.find_reusable(req).await? {
            tracing::info!(
                address = %candidate.address,
                eni = %req.eni_id,
                pod = %req.pod_name,
                "reusing available floating address"
            );
            return self.rebind(candidate, req).await;
        }

        let subnet = self.check_subnet(req).await?;
        self.check_eni(req).await?;

        let address = self.cloud.assign_ip("", &req.eni_id).await?;
        // Point of no return: the address is assigned provider-side. A store
        // failure below leaks it until repaired out of band.
        let obj = self.create_object(address, &subnet, req).await?;
        tracing::info!(
            address = %obj.address,
            eni = %req.eni_id,
            pod = %req.pod_name,
            "assigned new floating address"
        );
        Ok(obj)
    }

    /// An Available, non-fixed object on the same (eni, subnet, cluster) can
    /// be rebound without touching the provider.
    async fn find_reusable(&self, req: &AllocateIpRequest) -> Result<Option<IpObject>> {
        let filter = IpObjectFilter::new()
            .status(IpStatus::Available)
            .is_fixed(false)
            .eni_id(req.eni_id.clone())
            .subnet_id(req.subnet_id.clone())
            .cluster(req.cluster.clone());
        let mut candidates = self.store.list_ips(&filter).await?;
        let first = candidates.drain(..).next();
        Ok(first)
    }

    async fn rebind(&self, mut obj: IpObject, req: &AllocateIpRequest) -> Result<IpObject> {
        obj.namespace = req.namespace.clone();
        obj.pod_name = req.pod_name.clone();
        obj.workload_name = req.workload_name.clone();
        obj.workload_kind = req.workload_kind.clone();
        obj.container_id = req.container_id.clone();
        obj.host = req.host.clone();
        obj.status = IpStatus::Active;
        obj.update_time = now();
        self.store.update_ip(&obj).await
    }

    async fn check_subnet(&self, req: &AllocateIpRequest) -> Result<CloudSubnet> {
        let subnet = self.store.get_subnet(&req.subnet_id).await?;
        if !subnet.is_enabled() {
            return Err(Error::SubnetDisabled(req.subnet_id.clone()));
        }
        Ok(subnet)
    }

    async fn check_eni(&self, req: &AllocateIpRequest) -> Result<()> {
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
        Ok(())
    }

    async fn create_object(
        &self,
        address: String,
        subnet: &CloudSubnet,
        req: &AllocateIpRequest,
    ) -> Result<IpObject> {
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
            is_fixed: false,
            status: IpStatus::Active,
            resource_version: 0,
            create_time: ts,
            update_time: ts,
            keep_duration: 0,
        };
        self.store.create_ip(&obj).await
    }
}

fn validate(req: &AllocateIpRequest) -> Result<()> {
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
