//! # enipam
//!
//! IPAM core for cloud elastic network interfaces (ENIs): hands out,
//! migrates, and reclaims secondary IP addresses for container workloads.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              enipam server                   │
//! │  Allocator / FixedAllocator / Release        │
//! │  NodeCleaner / IdleCleaner (leader-gated)    │
//! └────────┬─────────────────────────┬───────────┘
//!          │ IpamStore trait         │ CloudProvider trait
//!   ┌──────▼────────┐        ┌───────▼────────┐
//!   │ document store│        │ provider ENI   │
//!   │ (CAS writes)  │        │ API            │
//!   └───────────────┘        └────────────────┘
//! ```
//!
//! The store is the single source of truth; every mutation is a
//! compare-and-swap on the object's resource version. The cloud provider is
//! eventually consistent and must tolerate repeated unassigns. There is no
//! cross-system transaction: multi-step workflows park objects in a
//! `Deleting` state first, and the leader-gated idle cleaner re-drives any
//! teardown a crash left unfinished.
//!
//! ## Usage
//!
//! ```bash
//! enipam-server serve --bind 0.0.0.0:9527 --cluster prod --leader
//! ```

pub mod cloud;
pub mod common;
pub mod ipam;
pub mod leader;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use cloud::{CloudProvider, FakeCloud};
pub use common::{Config, Error, Result};
pub use ipam::{Allocator, FixedAllocator, IdleCleaner, NodeCleaner, ReleaseHandlers, SubnetOps};
pub use leader::{LeaderGate, StaticGate};
pub use server::Server;
pub use store::{IpamStore, MemStore};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
