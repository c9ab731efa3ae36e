//! Common utilities and types shared across enipam

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, IpamConfig, ServerConfig};
pub use error::{Error, Result};
pub use types::{now, CloudSubnet, EniInfo, IpObject, IpObjectFilter, IpStatus, SubnetState};
