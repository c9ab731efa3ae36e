//! IPAM server assembly
//!
//! Wires the collaborator handles into the allocation components, spawns the
//! idle-cleaner task, and serves the HTTP API.

pub mod http;

use crate::cloud::CloudProvider;
use crate::common::{Config, Result};
use crate::ipam::idle_cleaner::start_idle_cleaner;
use crate::ipam::{Allocator, FixedAllocator, IdleCleaner, NodeCleaner, ReleaseHandlers, SubnetOps};
use crate::leader::LeaderGate;
use crate::store::IpamStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Shared handler state: one instance of each component, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub allocator: Arc<Allocator>,
    pub fixed: Arc<FixedAllocator>,
    pub releases: Arc<ReleaseHandlers>,
    pub node_cleaner: Arc<NodeCleaner>,
    pub idle_cleaner: Arc<IdleCleaner>,
    pub subnets: Arc<SubnetOps>,
    pub gate: Arc<dyn LeaderGate>,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn IpamStore>,
        cloud: Arc<dyn CloudProvider>,
        gate: Arc<dyn LeaderGate>,
    ) -> Self {
        // Seeded once at assembly; victim selection draws from this instance.
        let rng = StdRng::from_entropy();
        Self {
            allocator: Arc::new(Allocator::new(store.clone(), cloud.clone())),
            fixed: Arc::new(FixedAllocator::new(
                store.clone(),
                cloud.clone(),
                rng,
                config.ipam.evict_settle_delay(),
            )),
            releases: Arc::new(ReleaseHandlers::new(store.clone())),
            node_cleaner: Arc::new(NodeCleaner::new(store.clone(), cloud.clone())),
            idle_cleaner: Arc::new(IdleCleaner::new(
                store.clone(),
                cloud.clone(),
                gate.clone(),
                config.ipam.clone(),
            )),
            subnets: Arc::new(SubnetOps::new(store, cloud)),
            gate,
        }
    }
}

pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    pub fn new(
        config: Config,
        store: Arc<dyn IpamStore>,
        cloud: Arc<dyn CloudProvider>,
        gate: Arc<dyn LeaderGate>,
    ) -> Self {
        let state = AppState::new(&config, store, cloud, gate);
        Self { config, state }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting enipam server");
        tracing::info!("  HTTP API: {}", self.config.server.bind_addr);
        tracing::info!("  Cluster: {}", self.config.ipam.cluster);
        tracing::info!(
            "  Idle reclaim: threshold {}s, sweep every {}s",
            self.config.ipam.max_idle_secs,
            self.config.ipam.cleaner_interval_secs
        );

        let _cleaner_handle = start_idle_cleaner(self.state.idle_cleaner.clone());

        let router = http::with_timeout(
            http::create_router(self.state),
            self.config.server.request_timeout(),
        );
        let listener = tokio::net::TcpListener::bind(self.config.server.bind_addr)
            .await
            .map_err(|e| crate::common::Error::Internal(e.to_string()))?;

        tracing::info!("Server ready");
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown signal received");
            })
            .await
            .map_err(|e| crate::common::Error::Internal(e.to_string()))
    }
}
