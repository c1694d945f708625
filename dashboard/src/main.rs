//! VPN dashboard - remote OpenVPN container control over SSH
//!
//! This is the main entry point for the dashboard service.
//! It serves the REST API that drives the remote container engine.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use vpn_dashboard::api::{create_router, mark_start, with_middleware};
use vpn_dashboard::config::AppConfig;
use vpn_dashboard::container::ContainerOps;
use vpn_dashboard::logging::init_logging;
use vpn_dashboard::remote::{RemoteExecutor, SshAuth, SshTransport};
use vpn_dashboard::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_logging(&config.log_level)?;
    mark_start();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting VPN dashboard"
    );

    // Initialize metrics system
    vpn_dashboard::metrics::init_metrics()?;
    info!("Prometheus metrics initialized");

    // Resolve SSH credentials once
    let ssh_settings = config.ssh_settings()?;
    match &ssh_settings.auth {
        SshAuth::PrivateKey(_) => info!("SSH authentication: private key"),
        SshAuth::Password(_) => info!("SSH authentication: password"),
        SshAuth::None => warn!("No SSH key or password configured; remote commands will fail"),
    }
    if ssh_settings.host_key_fingerprint.is_none() {
        warn!("VPN_SERVER_HOST_KEY not set; accepting any SSH host key");
    }
    if config.web_username == "admin" && config.web_password == "admin" {
        warn!("Dashboard is using the default admin/admin credentials");
    }
    info!(
        host = %ssh_settings.host,
        port = ssh_settings.port,
        user = %ssh_settings.username,
        "Remote host configured"
    );

    let transport = SshTransport::new(ssh_settings).context("Failed to initialize SSH transport")?;
    let executor = RemoteExecutor::new(Arc::new(transport), config.command_timeout());
    let container = ContainerOps::new(executor, config.container_runtime, config.container_name()?);
    info!(
        container = %container.container_name(),
        runtime = config.container_runtime.binary(),
        "Managing container"
    );

    if config.web_static_dir.is_dir() {
        info!(dir = %config.web_static_dir.display(), "Serving browser UI");
    } else {
        warn!(
            dir = %config.web_static_dir.display(),
            "Browser UI directory not found; only the API is available"
        );
    }

    // Create shared application state
    let state = Arc::new(AppState {
        config: config.clone(),
        container,
    });

    // Build the router with all routes and middleware
    let app = with_middleware(create_router(state));

    // Bind to address
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port).parse()?;
    info!(%addr, "Listening on");

    // Create the server
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("VPN dashboard stopped");
    Ok(())
}

/// Handle shutdown signals gracefully
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down...");
}
