//! Allocation / release / reclamation engine
//!
//! Every inbound RPC maps to one component here. Components follow
//! validate-then-execute: required fields are checked up front, then a fixed
//! ordered sequence of store/cloud steps runs, short-circuiting on the first
//! failure. Completed steps are never compensated; the idle cleaner's repair
//! pass is the only mechanism that converges state left behind by a crash.

pub mod allocator;
pub mod fixed;
pub mod idle_cleaner;
pub mod node_cleaner;
pub mod release;
pub mod subnet;

pub use allocator::Allocator;
pub use fixed::FixedAllocator;
pub use idle_cleaner::{IdleCleaner, SweepReport};
pub use node_cleaner::{CleanReport, NodeCleaner};
pub use release::ReleaseHandlers;
pub use subnet::SubnetOps;

use serde::{Deserialize, Serialize};

/// Floating-IP allocation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocateIpRequest {
    pub subnet_id: String,
    pub vpc_id: String,
    pub region: String,
    pub cluster: String,
    pub host: String,
    pub pod_name: String,
    pub namespace: String,
    pub workload_name: String,
    pub workload_kind: String,
    #[serde(default)]
    pub container_id: String,
    pub eni_id: String,
}

/// Fixed-IP allocation request. `address` may name a previously-allocated
/// fixed address; empty means "resolve by pod identity".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocateFixedIpRequest {
    #[serde(default)]
    pub address: String,
    pub subnet_id: String,
    pub vpc_id: String,
    pub region: String,
    pub cluster: String,
    pub host: String,
    pub pod_name: String,
    pub namespace: String,
    pub workload_name: String,
    pub workload_kind: String,
    #[serde(default)]
    pub container_id: String,
    pub eni_id: String,
    /// Retention hint in seconds, stored on the object.
    #[serde(default)]
    pub keep_duration: u64,
}

/// Release request, shared by Release and FixedRelease. The six identity
/// fields must match the stored object exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseIpRequest {
    pub address: String,
    pub vpc_id: String,
    pub region: String,
    pub eni_id: String,
    pub cluster: String,
    pub namespace: String,
    pub pod_name: String,
}

/// Per-host teardown request. `force` sweeps everything on the host,
/// including fixed and Active addresses (host decommission); otherwise only
/// Available floating addresses go.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanNodeRequest {
    pub cluster: String,
    pub host: String,
    #[serde(default)]
    pub force: bool,
}

/// Teardown of a pod identity's fixed addresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanFixedIpRequest {
    pub cluster: String,
    pub namespace: String,
    pub pod_name: String,
}

/// Subnet registration request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddSubnetRequest {
    pub subnet_id: String,
    pub vpc_id: String,
    pub region: String,
}

/// Subnet mutation request; unset fields stay as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSubnetRequest {
    pub subnet_id: String,
    #[serde(default)]
    pub state: Option<crate::common::SubnetState>,
    #[serde(default)]
    pub available_ip_num: Option<i64>,
}

pub(crate) fn require(field: &str, value: &str) -> crate::common::Result<()> {
    if value.is_empty() {
        return Err(crate::common::Error::InvalidParams(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}
