//! Logging module for the VPN dashboard
//!
//! Provides structured logging with tracing, supporting JSON output for production
//! and pretty printing for development.

use std::io::IsTerminal;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Map a configured level name to a tracing level, defaulting to INFO
pub fn parse_level(log_level: &str) -> Level {
    match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize the logging/tracing system
pub fn init_logging(log_level: &str) -> Result<()> {
    let level = parse_level(log_level);

    // Build filter from level or RUST_LOG env var; audit events follow the same level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vpn_dashboard={level},audit={level},tower_http={level}"
        ))
    });

    if std::io::stdout().is_terminal() {
        // Development: pretty colored output
        let stdout_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .pretty()
            .with_writer(std::io::stdout);

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .try_init()?;
    } else {
        // Production: JSON lines
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .json()
            .with_writer(std::io::stdout);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
