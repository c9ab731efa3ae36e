//! Shared data model for the IPAM core
//!
//! Stores:
//! - IpObject (one allocated ENI secondary address, keyed by address)
//! - CloudSubnet (administrative subnet record)
//! - EniInfo (read-through view of a provider ENI, never persisted)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an allocated address.
///
/// `Deleting` is transient: an object parked there is mid-teardown and is
/// re-driven by the idle cleaner until the provider unassign and the store
/// delete both complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpStatus {
    Active,
    Available,
    Deleting,
}

/// One allocated cloud secondary address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpObject {
    /// The address itself; globally unique, primary key in the store.
    pub address: String,
    pub vpc_id: String,
    pub region: String,
    pub subnet_id: String,
    pub subnet_cidr: String,
    pub cluster: String,
    pub namespace: String,
    pub pod_name: String,
    pub workload_name: String,
    pub workload_kind: String,
    pub container_id: String,
    pub host: String,
    pub eni_id: String,
    /// Sticky flag. Flips false -> true at most once (victim promotion);
    /// never true -> false.
    pub is_fixed: bool,
    pub status: IpStatus,
    /// Store-issued optimistic-concurrency token. 0 = never persisted.
    pub resource_version: u64,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    /// Retention hint in seconds, persisted but not consulted by the cleaner.
    pub keep_duration: u64,
}

impl IpObject {
    /// True when (vpc, region, eni, cluster, namespace, pod) all match the
    /// caller's claim. Release paths refuse to touch an object that fails this.
    pub fn owned_by(
        &self,
        vpc_id: &str,
        region: &str,
        eni_id: &str,
        cluster: &str,
        namespace: &str,
        pod_name: &str,
    ) -> bool {
        self.vpc_id == vpc_id
            && self.region == region
            && self.eni_id == eni_id
            && self.cluster == cluster
            && self.namespace == namespace
            && self.pod_name == pod_name
    }
}

/// Administrative state of a subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetState {
    Enabled,
    Disabled,
}

/// Administrative record of a cloud subnet usable for allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudSubnet {
    pub subnet_id: String,
    pub vpc_id: String,
    pub region: String,
    pub zone: String,
    pub subnet_cidr: String,
    pub available_ip_num: i64,
    pub state: SubnetState,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl CloudSubnet {
    pub fn is_enabled(&self) -> bool {
        self.state == SubnetState::Enabled
    }
}

/// Read-through view of a provider ENI. Used only to validate that a request's
/// (vpc, region, subnet) matches the ENI's actual attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EniInfo {
    pub eni_id: String,
    pub vpc_id: String,
    pub region: String,
    pub subnet_id: String,
}

/// Conjunction of equality predicates for listing IpObjects.
#[derive(Debug, Clone, Default)]
pub struct IpObjectFilter {
    pub status: Option<IpStatus>,
    pub is_fixed: Option<bool>,
    pub eni_id: Option<String>,
    pub subnet_id: Option<String>,
    pub cluster: Option<String>,
    pub host: Option<String>,
    pub namespace: Option<String>,
}

impl IpObjectFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: IpStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_fixed(mut self, is_fixed: bool) -> Self {
        self.is_fixed = Some(is_fixed);
        self
    }

    pub fn eni_id(mut self, eni_id: impl Into<String>) -> Self {
        self.eni_id = Some(eni_id.into());
        self
    }

    pub fn subnet_id(mut self, subnet_id: impl Into<String>) -> Self {
        self.subnet_id = Some(subnet_id.into());
        self
    }

    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// All set predicates must hold.
    pub fn matches(&self, obj: &IpObject) -> bool {
        if let Some(status) = self.status {
            if obj.status != status {
                return false;
            }
        }
        if let Some(is_fixed) = self.is_fixed {
            if obj.is_fixed != is_fixed {
                return false;
            }
        }
        if let Some(ref eni_id) = self.eni_id {
            if &obj.eni_id != eni_id {
                return false;
            }
        }
        if let Some(ref subnet_id) = self.subnet_id {
            if &obj.subnet_id != subnet_id {
                return false;
            }
        }
        if let Some(ref cluster) = self.cluster {
            if &obj.cluster != cluster {
                return false;
            }
        }
        if let Some(ref host) = self.host {
            if &obj.host != host {
                return false;
            }
        }
        if let Some(ref namespace) = self.namespace {
            if &obj.namespace != namespace {
                return false;
            }
        }
        true
    }
}

/// Current UTC time, single call site for the whole crate.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
