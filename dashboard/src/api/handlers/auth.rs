//! Login handler

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{info, warn};

use crate::api::auth::issue_token;
use crate::api::error::{ApiError, AuthFailure};
use crate::audit::{AuditEvent, AuditOutcome};
use crate::metrics::record_login;
use crate::models::{LoginRequest, LoginResponse};
use crate::AppState;

/// Exchange dashboard credentials for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let accepted = request.username == state.config.web_username
        && request.password == state.config.web_password;
    record_login(accepted);

    if !accepted {
        warn!(username = %request.username, "Rejected dashboard login");
        AuditEvent::login(&request.username, AuditOutcome::Denied).emit();
        return Err(ApiError::Unauthorized(AuthFailure::InvalidCredentials));
    }

    info!(username = %request.username, "Dashboard login");
    AuditEvent::login(&request.username, AuditOutcome::Success).emit();

    Ok(Json(LoginResponse {
        success: true,
        token: issue_token(&request.username, &request.password),
        message: "Authentication successful".to_string(),
    }))
}
