//! VPN container handlers

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use tracing::{error, info};

use crate::api::{ApiError, AuthenticatedUser};
use crate::audit::{AuditEvent, AuditOutcome};
use crate::container::DEFAULT_LOG_LINES;
use crate::models::{ActionResponse, ContainerStatus, LogsResponse};
use crate::AppState;

/// Current state of the managed container
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> Result<Json<ContainerStatus>, ApiError> {
    let container = state.container.clone();
    let report = detached(async move { container.status().await }).await?.map_err(|e| {
        error!(error = %e, "Status query failed");
        ApiError::remote("Unable to connect to the VPN server", &e)
    })?;

    if !report.result.success() {
        return Err(ApiError::command_failed(
            "Failed to check container status",
            &report.result.stderr,
        ));
    }

    info!(status = report.status.state.as_str(), "Container status");
    Ok(Json(report.status))
}

/// Mutating operations exposed over the API
#[derive(Debug, Clone, Copy)]
enum Control {
    Start,
    Stop,
    Restart,
}

impl Control {
    fn verb(self) -> &'static str {
        match self {
            Control::Start => "start",
            Control::Stop => "stop",
            Control::Restart => "restart",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Control::Start => "started",
            Control::Stop => "stopped",
            Control::Restart => "restarted",
        }
    }
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<ActionResponse>, ApiError> {
    control(&state, &user, Control::Start).await
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<ActionResponse>, ApiError> {
    control(&state, &user, Control::Stop).await
}

pub async fn restart(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<ActionResponse>, ApiError> {
    control(&state, &user, Control::Restart).await
}

/// Run a mutating operation; a non-zero exit is reported as a failure
async fn control(
    state: &AppState,
    user: &AuthenticatedUser,
    action: Control,
) -> Result<Json<ActionResponse>, ApiError> {
    let name = state.container.container_name().to_string();
    let verb = action.verb();

    let container = state.container.clone();
    let outcome = detached(async move {
        match action {
            Control::Start => container.start().await,
            Control::Stop => container.stop().await,
            Control::Restart => container.restart().await,
        }
    })
    .await?;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, action = verb, "Container operation failed");
            AuditEvent::container_control(&user.username, verb, &name, AuditOutcome::Failure)
                .with_detail(e.to_string())
                .emit();
            return Err(ApiError::remote(format!("Unable to {} the container", verb), &e));
        }
    };

    if !result.success() {
        AuditEvent::container_control(&user.username, verb, &name, AuditOutcome::Failure)
            .with_detail(result.stderr.clone())
            .emit();
        return Err(ApiError::command_failed(
            format!("Failed to {} the container", verb),
            &result.stderr,
        ));
    }

    AuditEvent::container_control(&user.username, verb, &name, AuditOutcome::Success).emit();

    Ok(Json(ActionResponse {
        success: true,
        message: format!("Container {} {} successfully", name, action.past_tense()),
        output: result.stdout,
    }))
}

/// Tail of the container log; `?lines=N` defaults to 50, as does an empty value
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<LogsResponse>, ApiError> {
    let lines = match params.get("lines").map(|raw| raw.trim()) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<u32>()
            .map_err(|_| ApiError::BadRequest(format!("lines must be a non-negative integer, got {:?}", raw)))?,
        _ => DEFAULT_LOG_LINES,
    };

    let container = state.container.clone();
    let result = detached(async move { container.logs(lines).await }).await?.map_err(|e| {
        error!(error = %e, "Log retrieval failed");
        ApiError::remote("Unable to retrieve logs", &e)
    })?;

    Ok(Json(LogsResponse {
        logs: result.stdout,
        timestamp: Utc::now(),
    }))
}

/// Run a container operation on its own task.
///
/// A client that disconnects drops the handler future; the spawned task still
/// runs the remote command to completion and closes its session.
async fn detached<F, T>(operation: F) -> Result<T, ApiError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation)
        .await
        .map_err(|e| ApiError::Internal(format!("container operation task failed: {}", e)))
}
