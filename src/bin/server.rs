//! enipam server binary
//!
//! Single-node assembly: in-memory store, fake provider, static leader gate.
//! Production deployments swap the collaborators behind the same traits.

use clap::{Parser, Subcommand};
use enipam::{Config, FakeCloud, MemStore, Server, StaticGate};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "enipam-server")]
#[command(about = "ENI secondary-IP allocation service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the IPAM server
    Serve {
        /// Config file path (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bind address for the HTTP API
        #[arg(long)]
        bind: Option<String>,

        /// Cluster this server manages
        #[arg(long)]
        cluster: Option<String>,

        /// Idle threshold in seconds for floating-address reclamation
        #[arg(long)]
        max_idle: Option<u64>,

        /// Assume leadership (single-replica deployments)
        #[arg(long, default_value = "false")]
        leader: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            cluster,
            max_idle,
            leader,
        } => {
            // File config first, CLI flags override
            let mut config = Config::load(config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind_addr = bind.parse()?;
            }
            if let Some(cluster) = cluster {
                config.ipam.cluster = cluster;
            }
            if let Some(max_idle) = max_idle {
                config.ipam.max_idle_secs = max_idle;
            }

            let store = Arc::new(MemStore::new());
            let cloud = Arc::new(FakeCloud::new());
            let gate = StaticGate::new(leader);

            let server = Server::new(config, store, cloud, gate);
            server.serve().await?;
        }
    }

    Ok(())
}
