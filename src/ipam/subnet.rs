//! Subnet administration
//!
//! The allocation core only reads subnet state; these operations maintain the
//! records. AddSubnet reads cidr and zone through the provider rather than
//! trusting the caller.

use crate::cloud::CloudProvider;
use crate::common::{now, CloudSubnet, Result, SubnetState};
use crate::ipam::{require, AddSubnetRequest, ChangeSubnetRequest};
use crate::store::IpamStore;
use std::sync::Arc;

pub struct SubnetOps {
    store: Arc<dyn IpamStore>,
    cloud: Arc<dyn CloudProvider>,
}

impl SubnetOps {
    pub fn new(store: Arc<dyn IpamStore>, cloud: Arc<dyn CloudProvider>) -> Self {
        Self { store, cloud }
    }

    pub async fn add_subnet(&self, req: &AddSubnetRequest) -> Result<CloudSubnet> {
        require("subnet_id", &req.subnet_id)?;
        require("vpc_id", &req.vpc_id)?;
        require("region", &req.region)?;

        let desc = self
            .cloud
            .describe_subnet(&req.vpc_id, &req.region, &req.subnet_id)
            .await?;
        let ts = now();
        let subnet = CloudSubnet {
            subnet_id: req.subnet_id.clone(),
            vpc_id: req.vpc_id.clone(),
            region: req.region.clone(),
            zone: desc.zone,
            subnet_cidr: desc.subnet_cidr.clone(),
            available_ip_num: cidr_capacity(&desc.subnet_cidr),
            state: SubnetState::Enabled,
            create_time: ts,
            update_time: ts,
        };
        let subnet = self.store.create_subnet(&subnet).await?;
        tracing::info!(subnet = %subnet.subnet_id, cidr = %subnet.subnet_cidr, "registered subnet");
        Ok(subnet)
    }

    pub async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        require("subnet_id", subnet_id)?;
        self.store.delete_subnet(subnet_id).await?;
        tracing::info!(subnet = %subnet_id, "deleted subnet");
        Ok(())
    }

    pub async fn change_subnet(&self, req: &ChangeSubnetRequest) -> Result<CloudSubnet> {
        require("subnet_id", &req.subnet_id)?;
        let mut subnet = self.store.get_subnet(&req.subnet_id).await?;
        if let Some(state) = req.state {
            subnet.state = state;
        }
        if let Some(available) = req.available_ip_num {
            subnet.available_ip_num = available;
        }
        self.store.update_subnet(&subnet).await
    }

    pub async fn list_subnets(&self) -> Result<Vec<CloudSubnet>> {
        self.store.list_subnets().await
    }

    /// Subnets eligible for allocation: Enabled with capacity left.
    pub async fn get_available_subnets(&self) -> Result<Vec<CloudSubnet>> {
        Ok(self
            .store
            .list_subnets()
            .await?
            .into_iter()
            .filter(|s| s.is_enabled() && s.available_ip_num > 0)
            .collect())
    }
}

/// Usable host addresses of a CIDR block, minus network, broadcast, and the
/// provider-reserved gateway address.
fn cidr_capacity(cidr: &str) -> i64 {
    let Some(prefix) = cidr.split('/').nth(1).and_then(|p| p.parse::<u32>().ok()) else {
        return 0;
    };
    if prefix >= 31 {
        return 0;
    }
    (1i64 << (32 - prefix)) - 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::FakeCloud;
    use crate::store::MemStore;

    fn ops() -> (Arc<MemStore>, SubnetOps) {
        let store = Arc::new(MemStore::new());
        let cloud = Arc::new(FakeCloud::new());
        cloud.add_subnet("sbn-1", "10.0.0.0/24", "zoneA");
        (store.clone(), SubnetOps::new(store, cloud))
    }

    #[test]
    fn test_cidr_capacity() {
        assert_eq!(cidr_capacity("10.0.0.0/24"), 253);
        assert_eq!(cidr_capacity("10.0.0.0/28"), 13);
        assert_eq!(cidr_capacity("bogus"), 0);
    }

    #[tokio::test]
    async fn test_add_subnet_reads_through_provider() {
        let (store, ops) = ops();
        let subnet = ops
            .add_subnet(&AddSubnetRequest {
                subnet_id: "sbn-1".into(),
                vpc_id: "vpc-1".into(),
                region: "gz".into(),
            })
            .await
            .unwrap();
        assert_eq!(subnet.subnet_cidr, "10.0.0.0/24");
        assert_eq!(subnet.zone, "zoneA");
        assert_eq!(subnet.state, SubnetState::Enabled);
        assert!(store.get_subnet("sbn-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_change_and_available_listing() {
        let (_, ops) = ops();
        ops.add_subnet(&AddSubnetRequest {
            subnet_id: "sbn-1".into(),
            vpc_id: "vpc-1".into(),
            region: "gz".into(),
        })
        .await
        .unwrap();

        assert_eq!(ops.get_available_subnets().await.unwrap().len(), 1);

        ops.change_subnet(&ChangeSubnetRequest {
            subnet_id: "sbn-1".into(),
            state: Some(SubnetState::Disabled),
            available_ip_num: None,
        })
        .await
        .unwrap();

        assert!(ops.get_available_subnets().await.unwrap().is_empty());
        assert_eq!(ops.list_subnets().await.unwrap().len(), 1);
    }
}
