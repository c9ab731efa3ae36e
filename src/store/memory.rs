//! In-memory store with optimistic concurrency
//!
//! Backs tests and single-node runs. Mirrors the contract of the external
//! document store: writes bump a per-object resource version, updates are
//! compare-and-swap on the version the caller read.

use crate::common::{CloudSubnet, Error, IpObject, IpObjectFilter, Result};
use crate::store::IpamStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// In-memory store (default for tests)
pub struct MemStore {
    ips: RwLock<HashMap<String, IpObject>>,
    subnets: RwLock<HashMap<String, CloudSubnet>>,
    version_counter: AtomicU64,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            ips: RwLock::new(HashMap::new()),
            subnets: RwLock::new(HashMap::new()),
            version_counter: AtomicU64::new(1),
        }
    }

    fn next_version(&self) -> u64 {
        self.version_counter.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IpamStore for MemStore {
    async fn create_ip(&self, obj: &IpObject) -> Result<IpObject> {
        let mut ips = self.ips.write().await;
        if ips.contains_key(&obj.address) {
            return Err(Error::StoreOp(format!(
                "object {} already exists",
                obj.address
            )));
        }
        let mut stored = obj.clone();
        stored.resource_version = self.next_version();
        ips.insert(stored.address.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_ip(&self, address: &str) -> Result<IpObject> {
        let ips = self.ips.read().await;
        ips.get(address)
            .cloned()
            .ok_or_else(|| Error::NotFound(address.to_string()))
    }

    async fn update_ip(&self, obj: &IpObject) -> Result<IpObject> {
        let mut ips = self.ips.write().await;
        let current = ips
            .get(&obj.address)
            .ok_or_else(|| Error::NotFound(obj.address.clone()))?;
        if current.resource_version != obj.resource_version {
            return Err(Error::Conflict(obj.address.clone()));
        }
        let mut stored = obj.clone();
        stored.resource_version = self.next_version();
        stored.update_time = crate::common::now();
        ips.insert(stored.address.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete_ip(&self, address: &str) -> Result<()> {
        let mut ips = self.ips.write().await;
        ips.remove(address)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(address.to_string()))
    }

    async fn list_ips(&self, filter: &IpObjectFilter) -> Result<Vec<IpObject>> {
        let ips = self.ips.read().await;
        let mut out: Vec<IpObject> = ips.values().filter(|o| filter.matches(o)).cloned().collect();
        // Deterministic order for callers and tests
        out.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(out)
    }

    async fn create_subnet(&self, subnet: &CloudSubnet) -> Result<CloudSubnet> {
        let mut subnets = self.subnets.write().await;
        if subnets.contains_key(&subnet.subnet_id) {
            return Err(Error::StoreOp(format!(
                "subnet {} already exists",
                subnet.subnet_id
            )));
        }
        subnets.insert(subnet.subnet_id.clone(), subnet.clone());
        Ok(subnet.clone())
    }

    async fn get_subnet(&self, subnet_id: &str) -> Result<CloudSubnet> {
        let subnets = self.subnets.read().await;
        subnets
            .get(subnet_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(subnet_id.to_string()))
    }

    async fn update_subnet(&self, subnet: &CloudSubnet) -> Result<CloudSubnet> {
        let mut subnets = self.subnets.write().await;
        if !subnets.contains_key(&subnet.subnet_id) {
            return Err(Error::NotFound(subnet.subnet_id.clone()));
        }
        let mut stored = subnet.clone();
        stored.update_time = crate::common::now();
        subnets.insert(stored.subnet_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        let mut subnets = self.subnets.write().await;
        subnets
            .remove(subnet_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(subnet_id.to_string()))
    }

    async fn list_subnets(&self) -> Result<Vec<CloudSubnet>> {
        let subnets = self.subnets.read().await;
        let mut out: Vec<CloudSubnet> = subnets.values().cloned().collect();
        out.sort_by(|a, b| a.subnet_id.cmp(&b.subnet_id));
        Ok(out)
    }
}
