//! Persistence seam for IPAM records
//!
//! The production backing store is an external CRD-style document store with
//! label-equality querying and optimistic-concurrency writes. This crate only
//! depends on the capability trait below; [`memory::MemStore`] ships as the
//! in-process implementation for tests and single-node runs.

pub mod memory;

use crate::common::{CloudSubnet, IpObject, IpObjectFilter, Result};
use async_trait::async_trait;

pub use memory::MemStore;

/// Capability trait for IpObject / CloudSubnet persistence.
///
/// Mutations take the object's previously-read `resource_version` and must
/// fail with `Error::Conflict` on mismatch, distinct from `Error::NotFound`.
/// The store is the single synchronization point of the whole system.
#[async_trait]
pub trait IpamStore: Send + Sync {
    // === IpObject operations ===

    /// Create a new object. The stored copy gets a fresh resource_version.
    async fn create_ip(&self, obj: &IpObject) -> Result<IpObject>;

    async fn get_ip(&self, address: &str) -> Result<IpObject>;

    /// Compare-and-swap update keyed on `obj.resource_version`.
    async fn update_ip(&self, obj: &IpObject) -> Result<IpObject>;

    async fn delete_ip(&self, address: &str) -> Result<()>;

    /// List objects matching every set predicate of the filter.
    async fn list_ips(&self, filter: &IpObjectFilter) -> Result<Vec<IpObject>>;

    // === CloudSubnet operations ===

    async fn create_subnet(&self, subnet: &CloudSubnet) -> Result<CloudSubnet>;

    async fn get_subnet(&self, subnet_id: &str) -> Result<CloudSubnet>;

    async fn update_subnet(&self, subnet: &CloudSubnet) -> Result<CloudSubnet>;

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()>;

    async fn list_subnets(&self) -> Result<Vec<CloudSubnet>>;
}
