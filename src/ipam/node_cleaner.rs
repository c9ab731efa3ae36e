//! Per-host teardown
//!
//! Graceful mode reclaims only Available floating addresses on the host;
//! forced mode (host decommission) takes everything regardless of status or
//! the fixed flag. The batch is fail-fast: the first object whose teardown
//! fails aborts the rest, and objects already torn down stay torn down.

use crate::cloud::CloudProvider;
use crate::common::{IpObject, IpObjectFilter, IpStatus, Result};
use crate::ipam::{require, CleanFixedIpRequest, CleanNodeRequest};
use crate::store::IpamStore;
use std::sync::Arc;

/// Outcome of a teardown batch.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CleanReport {
    pub candidates: usize,
    pub cleaned: usize,
}

pub struct NodeCleaner {
    store: Arc<dyn IpamStore>,
    cloud: Arc<dyn CloudProvider>,
}

impl NodeCleaner {
    pub fn new(store: Arc<dyn IpamStore>, cloud: Arc<dyn CloudProvider>) -> Self {
        Self { store, cloud }
    }

    pub async fn clean_node(&self, req: &CleanNodeRequest) -> Result<CleanReport> {
        require("cluster", &req.cluster)?;
        require("host", &req.host)?;

        let mut filter = IpObjectFilter::new()
            .cluster(req.cluster.clone())
            .host(req.host.clone());
        if !req.force {
            filter = filter.status(IpStatus::Available).is_fixed(false);
        }
        let candidates = self.store.list_ips(&filter).await?;

        tracing::info!(
            host = %req.host,
            force = req.force,
            count = candidates.len(),
            "cleaning node"
        );
        self.teardown_batch(candidates).await
    }

    /// Tear down every fixed address held by one pod identity. Used when the
    /// identity itself is being retired, so the sticky reservation must go too.
    pub async fn clean_fixed(&self, req: &CleanFixedIpRequest) -> Result<CleanReport> {
        require("cluster", &req.cluster)?;
        require("namespace", &req.namespace)?;
        require("pod_name", &req.pod_name)?;

        let filter = IpObjectFilter::new()
            .cluster(req.cluster.clone())
            .namespace(req.namespace.clone())
            .is_fixed(true);
        let candidates: Vec<IpObject> = self
            .store
            .list_ips(&filter)
            .await?
            .into_iter()
            .filter(|o| o.pod_name == req.pod_name)
            .collect();

        tracing::info!(
            namespace = %req.namespace,
            pod = %req.pod_name,
            count = candidates.len(),
            "cleaning fixed addresses for pod identity"
        );
        self.teardown_batch(candidates).await
    }

    async fn teardown_batch(&self, candidates: Vec<IpObject>) -> Result<CleanReport> {
        let mut report = CleanReport {
            candidates: candidates.len(),
            cleaned: 0,
        };
        for obj in candidates {
            self.cloud.unassign_ip(&obj.address, &obj.eni_id).await?;
            self.store.delete_ip(&obj.address).await?;
            report.cleaned += 1;
        }
        Ok(report)
    }
}
