//! Audit trail for logins and container control
//!
//! Events are emitted as JSON on the `audit` tracing target so they can be
//! routed separately from the application log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Audit event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub user: String,
    pub action: String,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Audit event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    Authentication,
    ContainerControl,
}

/// Audit outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

impl AuditEvent {
    pub fn login(user: &str, outcome: AuditOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: AuditEventType::Authentication,
            user: user.to_string(),
            action: "login".to_string(),
            outcome,
            container: None,
            detail: None,
        }
    }

    pub fn container_control(user: &str, action: &str, container: &str, outcome: AuditOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: AuditEventType::ContainerControl,
            user: user.to_string(),
            action: action.to_string(),
            outcome,
            container: Some(container.to_string()),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Emit the event on the `audit` target
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => info!(target: "audit", "{}", json),
            Err(e) => tracing::error!(error = %e, "Failed to serialize audit event"),
        }
    }
}
