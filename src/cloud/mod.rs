//! Cloud provider seam
//!
//! The real provider SDK lives outside this crate; the allocator only needs
//! the five ENI operations below. [`fake::FakeCloud`] is the in-process
//! implementation used by tests and local runs.

pub mod fake;

use crate::common::{EniInfo, Result};
use async_trait::async_trait;

pub use fake::FakeCloud;

/// Capability trait over the provider's ENI API.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Resolve an ENI's actual (vpc, region, subnet) attachment.
    async fn query_eni(&self, eni_id: &str) -> Result<EniInfo>;

    /// Read-through subnet description: (cidr, zone).
    async fn describe_subnet(
        &self,
        vpc_id: &str,
        region: &str,
        subnet_id: &str,
    ) -> Result<SubnetDescription>;

    /// Assign a secondary address to an ENI. An empty `desired` lets the
    /// provider pick; returns the address actually assigned.
    async fn assign_ip(&self, desired: &str, eni_id: &str) -> Result<String>;

    /// Remove a secondary address from an ENI. Contract: calling this on an
    /// address that is already unassigned must succeed; the idle cleaner's
    /// repair pass depends on it.
    async fn unassign_ip(&self, address: &str, eni_id: &str) -> Result<()>;

    /// Move an address from one ENI to another.
    async fn migrate_ip(&self, address: &str, from_eni: &str, to_eni: &str) -> Result<()>;
}

/// Provider-side subnet attributes the allocator reads through.
#[derive(Debug, Clone)]
pub struct SubnetDescription {
    pub subnet_cidr: String,
    pub zone: String,
}
