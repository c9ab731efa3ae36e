//! In-process fake provider
//!
//! Deterministic stand-in for the cloud SDK: ENIs and subnets are registered
//! up front, assigned addresses come out of a per-subnet counter, and every
//! call is recorded so tests can assert call order. Individual operations can
//! be armed to fail.

use crate::cloud::{CloudProvider, SubnetDescription};
use crate::common::{EniInfo, Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// One recorded provider call, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudCall {
    QueryEni { eni_id: String },
    DescribeSubnet { subnet_id: String },
    AssignIp { address: String, eni_id: String },
    UnassignIp { address: String, eni_id: String },
    MigrateIp { address: String, from_eni: String, to_eni: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudOp {
    QueryEni,
    DescribeSubnet,
    AssignIp,
    UnassignIp,
    MigrateIp,
}

#[derive(Default)]
struct Inner {
    enis: HashMap<String, EniInfo>,
    subnets: HashMap<String, SubnetDescription>,
    /// eni_id -> assigned secondary addresses
    assigned: HashMap<String, HashSet<String>>,
    /// subnet_id -> next host octet
    counters: HashMap<String, u32>,
    calls: Vec<CloudCall>,
    failing: HashSet<CloudOp>,
}

/// Fake provider for tests and single-node runs.
pub struct FakeCloud {
    inner: Mutex<Inner>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Register an ENI with its attachment.
    pub fn add_eni(&self, eni_id: &str, vpc_id: &str, region: &str, subnet_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.enis.insert(
            eni_id.to_string(),
            EniInfo {
                eni_id: eni_id.to_string(),
                vpc_id: vpc_id.to_string(),
                region: region.to_string(),
                subnet_id: subnet_id.to_string(),
            },
        );
    }

    /// Register a subnet. The cidr must be a /24-style prefix, addresses are
    /// handed out as `<first three octets>.<counter>` starting at 2.
    pub fn add_subnet(&self, subnet_id: &str, cidr: &str, zone: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.subnets.insert(
            subnet_id.to_string(),
            SubnetDescription {
                subnet_cidr: cidr.to_string(),
                zone: zone.to_string(),
            },
        );
        inner.counters.insert(subnet_id.to_string(), 2);
    }

    /// Arm one operation to fail until disarmed.
    pub fn fail_on(&self, op: CloudOp) {
        self.inner.lock().unwrap().failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().failing.clear();
    }

    /// Snapshot of all recorded calls.
    pub fn calls(&self) -> Vec<CloudCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn reset_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Addresses currently assigned to an ENI.
    pub fn assigned_to(&self, eni_id: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<String> = inner
            .assigned
            .get(eni_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    fn prefix_of(cidr: &str) -> String {
        // "10.0.0.0/24" -> "10.0.0"
        let base = cidr.split('/').next().unwrap_or(cidr);
        let mut parts: Vec<&str> = base.split('.').collect();
        parts.truncate(3);
        parts.join(".")
    }
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudProvider for FakeCloud {
    async fn query_eni(&self, eni_id: &str) -> Result<EniInfo> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(CloudCall::QueryEni {
            eni_id: eni_id.to_string(),
        });
        if inner.failing.contains(&CloudOp::QueryEni) {
            return Err(Error::QueryEniFailed {
                eni_id: eni_id.to_string(),
                reason: "injected failure".into(),
            });
        }
        inner
            .enis
            .get(eni_id)
            .cloned()
            .ok_or_else(|| Error::QueryEniFailed {
                eni_id: eni_id.to_string(),
                reason: "no such ENI".into(),
            })
    }

    async fn describe_subnet(
        &self,
        _vpc_id: &str,
        _region: &str,
        subnet_id: &str,
    ) -> Result<SubnetDescription> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(CloudCall::DescribeSubnet {
            subnet_id: subnet_id.to_string(),
        });
        if inner.failing.contains(&CloudOp::DescribeSubnet) {
            return Err(Error::DescribeSubnetFailed {
                subnet_id: subnet_id.to_string(),
                reason: "injected failure".into(),
            });
        }
        inner
            .subnets
            .get(subnet_id)
            .cloned()
            .ok_or_else(|| Error::DescribeSubnetFailed {
                subnet_id: subnet_id.to_string(),
                reason: "no such subnet".into(),
            })
    }

    async fn assign_ip(&self, desired: &str, eni_id: &str) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing.contains(&CloudOp::AssignIp) {
            inner.calls.push(CloudCall::AssignIp {
                address: desired.to_string(),
                eni_id: eni_id.to_string(),
            });
            return Err(Error::AssignFailed {
                eni_id: eni_id.to_string(),
                reason: "injected failure".into(),
            });
        }

        let subnet_id = match inner.enis.get(eni_id) {
            Some(eni) => eni.subnet_id.clone(),
            None => {
                return Err(Error::AssignFailed {
                    eni_id: eni_id.to_string(),
                    reason: "no such ENI".into(),
                })
            }
        };

        let address = if desired.is_empty() {
            let cidr = inner
                .subnets
                .get(&subnet_id)
                .map(|s| s.subnet_cidr.clone())
                .ok_or_else(|| Error::AssignFailed {
                    eni_id: eni_id.to_string(),
                    reason: format!("subnet {} not registered", subnet_id),
                })?;
            let counter = inner.counters.entry(subnet_id.clone()).or_insert(2);
            let address = format!("{}.{}", Self::prefix_of(&cidr), counter);
            *counter += 1;
            address
        } else {
            desired.to_string()
        };

        inner
            .assigned
            .entry(eni_id.to_string())
            .or_default()
            .insert(address.clone());
        inner.calls.push(CloudCall::AssignIp {
            address: address.clone(),
            eni_id: eni_id.to_string(),
        });
        Ok(address)
    }

    async fn unassign_ip(&self, address: &str, eni_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(CloudCall::UnassignIp {
            address: address.to_string(),
            eni_id: eni_id.to_string(),
        });
        if inner.failing.contains(&CloudOp::UnassignIp) {
            return Err(Error::UnassignFailed {
                address: address.to_string(),
                eni_id: eni_id.to_string(),
                reason: "injected failure".into(),
            });
        }
        // Idempotent: removing an address that is not assigned is fine.
        if let Some(set) = inner.assigned.get_mut(eni_id) {
            set.remove(address);
        }
        Ok(())
    }

    async fn migrate_ip(&self, address: &str, from_eni: &str, to_eni: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(CloudCall::MigrateIp {
            address: address.to_string(),
            from_eni: from_eni.to_string(),
            to_eni: to_eni.to_string(),
        });
        if inner.failing.contains(&CloudOp::MigrateIp) {
            return Err(Error::MigrateFailed {
                address: address.to_string(),
                from_eni: from_eni.to_string(),
                to_eni: to_eni.to_string(),
                reason: "injected failure".into(),
            });
        }
        if !inner.enis.contains_key(to_eni) {
            return Err(Error::MigrateFailed {
                address: address.to_string(),
                from_eni: from_eni.to_string(),
                to_eni: to_eni.to_string(),
                reason: "no such target ENI".into(),
            });
        }
        if let Some(set) = inner.assigned.get_mut(from_eni) {
            set.remove(address);
        }
        inner
            .assigned
            .entry(to_eni.to_string())
            .or_default()
            .insert(address.to_string());
        Ok(())
    }
}
