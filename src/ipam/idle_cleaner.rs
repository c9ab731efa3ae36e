//! Leader-gated idle reclamation loop
//!
//! One sweep has two passes:
//!
//! 1. idle reclamation: Available floating addresses whose update_time is
//!    older than max_idle_time are parked in Deleting, unassigned from the
//!    provider, then deleted from the store. Marking Deleting before the
//!    provider call makes a crash between the two repairable.
//! 2. dirty-data repair: objects already in Deleting were left by a prior
//!    crash mid-teardown; the same unassign+delete sequence is re-driven.
//!    This relies on the provider tolerating unassign of an address that is
//!    already gone.
//!
//! The loop itself runs on every replica; only the elected leader executes
//! the sweep body, checked fresh at each tick. A failed object is logged and
//! skipped and the sweep keeps going; the next tick retries.

use crate::cloud::CloudProvider;
use crate::common::{now, Error, IpamConfig, IpObject, IpObjectFilter, IpStatus, Result};
use crate::leader::LeaderGate;
use crate::store::IpamStore;
use std::sync::Arc;

/// Outcome of one sweep, for logs and the admin endpoint.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SweepReport {
    /// Available floating objects examined.
    pub scanned: usize,
    /// Idle objects fully torn down this sweep.
    pub reclaimed: usize,
    /// Leftover Deleting objects fully torn down this sweep.
    pub repaired: usize,
    /// Objects whose teardown failed and will be retried next sweep.
    pub failed: usize,
}

pub struct IdleCleaner {
    store: Arc<dyn IpamStore>,
    cloud: Arc<dyn CloudProvider>,
    gate: Arc<dyn LeaderGate>,
    config: IpamConfig,
}

impl IdleCleaner {
    pub fn new(
        store: Arc<dyn IpamStore>,
        cloud: Arc<dyn CloudProvider>,
        gate: Arc<dyn LeaderGate>,
        config: IpamConfig,
    ) -> Self {
        Self {
            store,
            cloud,
            gate,
            config,
        }
    }

    /// One full sweep: idle reclamation, then repair of leftover Deleting
    /// objects. Callers decide when (the background loop) and whether (the
    /// leader gate) to run it.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        // === Pass 1: idle reclamation ===
        let idle_filter = IpObjectFilter::new()
            .status(IpStatus::Available)
            .is_fixed(false);
        let available = self.store.list_ips(&idle_filter).await?;
        report.scanned = available.len();

        let threshold = chrono::Duration::from_std(self.config.max_idle_time())
            .map_err(|e| Error::Internal(e.to_string()))?;
        for obj in available {
            if now() - obj.update_time <= threshold {
                continue;
            }
            match self.reclaim(obj).await {
                Ok(()) => report.reclaimed += 1,
                // Lost the CAS race to a foreground allocate; the object is
                // live again, leave it alone.
                Err(Error::Conflict(address)) => {
                    tracing::debug!(%address, "reclaim raced a foreground write, skipping");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "idle reclaim failed, will retry next sweep");
                    report.failed += 1;
                }
            }
            tokio::time::sleep(self.config.reclaim_pause()).await;
        }

        // === Pass 2: dirty-data repair ===
        let deleting_filter = IpObjectFilter::new()
            .status(IpStatus::Deleting)
            .is_fixed(false);
        for obj in self.store.list_ips(&deleting_filter).await? {
            match self.finish_teardown(&obj).await {
                Ok(()) => {
                    tracing::info!(address = %obj.address, "repaired leftover deleting object");
                    report.repaired += 1;
                }
                Err(e) => {
                    tracing::warn!(address = %obj.address, error = %e, "repair failed, will retry next sweep");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Park in Deleting first, then tear down. The CAS on the status write is
    /// what arbitrates against a concurrent allocate reusing this object.
    async fn reclaim(&self, mut obj: IpObject) -> Result<()> {
        obj.status = IpStatus::Deleting;
        obj.update_time = now();
        let obj = self.store.update_ip(&obj).await?;
        tracing::info!(address = %obj.address, eni = %obj.eni_id, "reclaiming idle address");
        self.finish_teardown(&obj).await
    }

    async fn finish_teardown(&self, obj: &IpObject) -> Result<()> {
        self.cloud.unassign_ip(&obj.address, &obj.eni_id).await?;
        self.store.delete_ip(&obj.address).await
    }
}

/// Start the background sweep loop. Ticks forever; skips the body while this
/// replica is not leader.
pub fn start_idle_cleaner(cleaner: Arc<IdleCleaner>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleaner.config.cleaner_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !cleaner.gate.is_leader() {
                tracing::debug!("not leader, skipping idle sweep");
                continue;
            }
            match cleaner.sweep().await {
                Ok(report) => {
                    if report.reclaimed > 0 || report.repaired > 0 || report.failed > 0 {
                        tracing::info!(
                            reclaimed = report.reclaimed,
                            repaired = report.repaired,
                            failed = report.failed,
                            "idle sweep finished"
                        );
                    }
                }
                Err(e) => tracing::error!(error = %e, "idle sweep aborted"),
            }
        }
    })
}
