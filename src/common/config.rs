//! Configuration for the IPAM server

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ipam: IpamConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ipam: IpamConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Per-request handling cap; a hung provider call surfaces as 408
    /// instead of an indefinitely open socket
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:9527".parse().unwrap()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Allocation / reclamation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpamConfig {
    /// Cluster this server manages
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Idle age after which an Available floating address is reclaimed
    #[serde(default = "default_max_idle_secs")]
    pub max_idle_secs: u64,

    /// Interval between idle-cleaner sweeps
    #[serde(default = "default_cleaner_interval_secs")]
    pub cleaner_interval_secs: u64,

    /// Settle delay between victim eviction and the migrate call.
    /// Empirical: gives the provider time to observe the unassign.
    #[serde(default = "default_evict_settle_ms")]
    pub evict_settle_ms: u64,

    /// Pause between reclaimed objects, bounds the provider call rate
    #[serde(default = "default_reclaim_pause_ms")]
    pub reclaim_pause_ms: u64,
}

fn default_cluster() -> String {
    "default".to_string()
}
fn default_max_idle_secs() -> u64 {
    3600
}
fn default_cleaner_interval_secs() -> u64 {
    300
}
fn default_evict_settle_ms() -> u64 {
    3000
}
fn default_reclaim_pause_ms() -> u64 {
    200
}

impl Default for IpamConfig {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
            max_idle_secs: default_max_idle_secs(),
            cleaner_interval_secs: default_cleaner_interval_secs(),
            evict_settle_ms: default_evict_settle_ms(),
            reclaim_pause_ms: default_reclaim_pause_ms(),
        }
    }
}

impl IpamConfig {
    pub fn max_idle_time(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }

    pub fn cleaner_interval(&self) -> Duration {
        Duration::from_secs(self.cleaner_interval_secs)
    }

    pub fn evict_settle_delay(&self) -> Duration {
        Duration::from_millis(self.evict_settle_ms)
    }

    pub fn reclaim_pause(&self) -> Duration {
        Duration::from_millis(self.reclaim_pause_ms)
    }
}

impl Config {
    /// Load configuration: optional TOML file, then `ENIPAM_*` environment
    /// overrides. Missing file with no path given falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::with_name("enipam").required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("ENIPAM").separator("__"));

        let settings = builder
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ipam.max_idle_secs, 3600);
        assert_eq!(config.ipam.cleaner_interval_secs, 300);
        assert_eq!(config.server.bind_addr.port(), 9527);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enipam.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "log_level = \"debug\"\n\n[ipam]\ncluster = \"cce-prod\"\nmax_idle_secs = 600"
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.ipam.cluster, "cce-prod");
        assert_eq!(config.ipam.max_idle_secs, 600);
        // untouched fields keep their defaults
        assert_eq!(config.ipam.cleaner_interval_secs, 300);
    }
}
