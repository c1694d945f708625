//! Container management for the VPN dashboard
//!
//! Handles the managed container on the remote host:
//! - Building the fixed set of engine commands (status, start, stop, restart, logs)
//! - Validating the configured container name
//! - Interpreting the status listing

mod operations;
pub mod status;

pub use operations::{
    ContainerCommand, ContainerError, ContainerName, ContainerOps, ContainerRuntime, StatusReport,
    DEFAULT_LOG_LINES,
};
