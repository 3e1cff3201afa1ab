//! Ambient plumbing shared by the block store and metadata store binaries:
//! cluster configuration, CLI argument parsing, and tracing setup.

pub mod cli;
pub mod config;
pub mod tracing_setup;

pub use config::{ClusterConfig, ConfigError, ReplicaId};
