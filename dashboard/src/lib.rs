//! VPN dashboard library
//!
//! Monitors and controls a single container (an OpenVPN server) on a remote
//! host. Every operation opens its own SSH session, runs one container engine
//! command and closes the session again.

pub mod api;
pub mod audit;
pub mod config;
pub mod container;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod remote;

/// Application state shared across all handlers
pub struct AppState {
    pub config: config::AppConfig,
    pub container: container::ContainerOps,
}
