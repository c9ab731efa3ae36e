//! Release handlers
//!
//! Release parks a floating address back in the Available pool; FixedRelease
//! does the same for a fixed address while keeping it reserved for the pod
//! identity. Both are idempotent: releasing an already-released address is a
//! success with no store write.

use crate::common::{now, Error, IpObject, IpStatus, Result};
use crate::ipam::{require, ReleaseIpRequest};
use crate::store::IpamStore;
use std::sync::Arc;

pub struct ReleaseHandlers {
    store: Arc<dyn IpamStore>,
}

impl ReleaseHandlers {
    pub fn new(store: Arc<dyn IpamStore>) -> Self {
        Self { store }
    }

    /// Release a floating address. Fixed addresses are refused; they must go
    /// through [`ReleaseHandlers::release_fixed`].
    pub async fn release(&self, req: &ReleaseIpRequest) -> Result<()> {
        validate(req)?;
        let obj = self.load_owned(req).await?;
        if obj.is_fixed {
            return Err(Error::IsFixed(obj.address));
        }
        self.park(obj).await
    }

    /// Release a fixed address. The object keeps is_fixed=true so the address
    /// stays bound to the pod identity rather than rejoining the floating pool.
    pub async fn release_fixed(&self, req: &ReleaseIpRequest) -> Result<()> {
        validate(req)?;
        let obj = self.load_owned(req).await?;
        if !obj.is_fixed {
            return Err(Error::NotFixed(obj.address));
        }
        self.park(obj).await
    }

    async fn load_owned(&self, req: &ReleaseIpRequest) -> Result<IpObject> {
        let obj = self.store.get_ip(&req.address).await?;
        if !obj.owned_by(
            &req.vpc_id,
            &req.region,
            &req.eni_id,
            &req.cluster,
            &req.namespace,
            &req.pod_name,
        ) {
            return Err(Error::OwnershipMismatch {
                address: obj.address,
                reason: format!(
                    "release claimed by pod {}/{} on eni {}",
                    req.namespace, req.pod_name, req.eni_id
                ),
            });
        }
        Ok(obj)
    }

    async fn park(&self, mut obj: IpObject) -> Result<()> {
        if obj.status != IpStatus::Active {
            // Already released (or mid-teardown); nothing to write.
            tracing::debug!(address = %obj.address, status = ?obj.status, "release is a no-op");
            return Ok(());
        }
        obj.status = IpStatus::Available;
        obj.update_time = now();
        self.store.update_ip(&obj).await?;
        tracing::info!(address = %obj.address, fixed = obj.is_fixed, "released address");
        Ok(())
    }
}

fn validate(req: &ReleaseIpRequest) -> Result<()> {
    require("address", &req.address)?;
    require("vpc_id", &req.vpc_id)?;
    require("region", &req.region)?;
    require("eni_id", &req.eni_id)?;
    require("cluster", &req.cluster)?;
    require("namespace", &req.namespace)?;
    require("pod_name", &req.pod_name)?;
    Ok(())
}
