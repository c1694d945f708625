//! Data models for the VPN dashboard
//!
//! This module defines the API request/response types and the container
//! status model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Container Models
// ============================================================================

/// Normalized state of the managed container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Running,
    Stopped,
    NotFound,
    Unknown,
}

impl ContainerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Running => "running",
            ContainerState::Stopped => "stopped",
            ContainerState::NotFound => "not_found",
            ContainerState::Unknown => "unknown",
        }
    }
}

/// Container status as observed by one status query.
///
/// Serialized directly as the `GET /api/vpn/status` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    #[serde(rename = "status")]
    pub state: ContainerState,
    /// Port listing column, empty when the engine reported none
    pub ports: String,
    pub container_name: String,
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

/// Result of a start/stop/restart request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    /// Trimmed stdout of the engine command
    pub output: String,
}

/// Tail of the container log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Authentication Models
// ============================================================================

/// Dashboard login request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub message: String,
}

// ============================================================================
// Health Models
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub container_name: String,
}

// ============================================================================
// Error Models
// ============================================================================

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
