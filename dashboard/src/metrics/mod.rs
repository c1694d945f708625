//! Prometheus metrics export
//!
//! Provides metrics endpoint for monitoring remote command health

use axum::{http::StatusCode, response::IntoResponse};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Prometheus metrics recorder, installed once by [`init_metrics`]
static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Outcome label for a remote command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    NonZeroExit,
    Error,
}

impl CommandOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandOutcome::Success => "success",
            CommandOutcome::NonZeroExit => "nonzero_exit",
            CommandOutcome::Error => "error",
        }
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> anyhow::Result<()> {
    METRICS_HANDLE.get_or_try_init(|| {
        PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full("vpn_remote_command_duration_seconds".to_string()),
                &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
            )?
            .install_recorder()
            .map_err(anyhow::Error::from)
    })?;
    Ok(())
}

/// Record one remote container operation
pub fn record_remote_command(operation: &str, outcome: CommandOutcome, duration_secs: f64) {
    counter!(
        "vpn_remote_commands_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!("vpn_remote_command_duration_seconds", "operation" => operation.to_string())
        .record(duration_secs);
}

/// Record a dashboard login attempt
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("vpn_logins_total", "outcome" => outcome).increment(1);
}

/// Prometheus metrics endpoint handler
pub async fn metrics_handler() -> impl IntoResponse {
    match METRICS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [("Content-Type", "text/plain; version=0.0.4")],
            "metrics recorder not installed\n".to_string(),
        ),
    }
}
