//! Fixed vocabulary of container commands run through the remote executor

use std::fmt;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::metrics::{record_remote_command, CommandOutcome};
use crate::models::ContainerStatus;
use crate::remote::{CommandResult, RemoteError, RemoteExecutor};

use super::status::interpret;

/// Engine naming rule: alphanumeric start, then `[A-Za-z0-9_.-]`
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid container name regex"));

const MAX_NAME_LEN: usize = 128;

/// Default number of log lines fetched
pub const DEFAULT_LOG_LINES: u32 = 50;

/// Go template for the status listing; the engine expands `\t` itself
const STATUS_FORMAT: &str = r"table {{.Names}}\t{{.Status}}\t{{.Ports}}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Invalid container name {0:?}: must match [A-Za-z0-9][A-Za-z0-9_.-]* and be at most 128 characters")]
    InvalidName(String),
}

/// Container name that is safe to interpolate into a shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn parse(name: &str) -> Result<Self, ContainerError> {
        if name.len() > MAX_NAME_LEN || !NAME_PATTERN.is_match(name) {
            return Err(ContainerError::InvalidName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Container engine CLI on the remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    #[default]
    Docker,
    Podman,
}

impl ContainerRuntime {
    pub fn binary(&self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }
}

/// Administrative operations on the managed container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerCommand {
    Status,
    Start,
    Stop,
    Restart,
    Logs { lines: u32 },
}

impl ContainerCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerCommand::Status => "status",
            ContainerCommand::Start => "start",
            ContainerCommand::Stop => "stop",
            ContainerCommand::Restart => "restart",
            ContainerCommand::Logs { .. } => "logs",
        }
    }

    /// Command line for this operation against `name`
    pub fn render(&self, runtime: ContainerRuntime, name: &ContainerName) -> String {
        let bin = runtime.binary();
        match self {
            ContainerCommand::Status => format!(
                "{} ps -a --filter 'name=^/?{}$' --format '{}'",
                bin,
                regex::escape(name.as_str()),
                STATUS_FORMAT
            ),
            ContainerCommand::Start => format!("{} start {}", bin, name),
            ContainerCommand::Stop => format!("{} stop {}", bin, name),
            ContainerCommand::Restart => format!("{} restart {}", bin, name),
            ContainerCommand::Logs { lines } => format!("{} logs --tail {} {}", bin, lines, name),
        }
    }
}

/// Raw listing result plus its interpretation
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub result: CommandResult,
    pub status: ContainerStatus,
}

/// Runs container operations for one configured container
#[derive(Clone)]
pub struct ContainerOps {
    executor: RemoteExecutor,
    runtime: ContainerRuntime,
    name: ContainerName,
}

impl ContainerOps {
    pub fn new(executor: RemoteExecutor, runtime: ContainerRuntime, name: ContainerName) -> Self {
        Self {
            executor,
            runtime,
            name,
        }
    }

    pub fn container_name(&self) -> &ContainerName {
        &self.name
    }

    /// Query and interpret the container's state
    pub async fn status(&self) -> Result<StatusReport, RemoteError> {
        let result = self.run(ContainerCommand::Status).await?;
        let status = interpret(&result, self.name.as_str());
        Ok(StatusReport { result, status })
    }

    pub async fn start(&self) -> Result<CommandResult, RemoteError> {
        self.run(ContainerCommand::Start).await
    }

    pub async fn stop(&self) -> Result<CommandResult, RemoteError> {
        self.run(ContainerCommand::Stop).await
    }

    pub async fn restart(&self) -> Result<CommandResult, RemoteError> {
        self.run(ContainerCommand::Restart).await
    }

    /// Last `lines` lines of the container log
    pub async fn logs(&self, lines: u32) -> Result<CommandResult, RemoteError> {
        self.run(ContainerCommand::Logs { lines }).await
    }

    /// Execute one operation; failures propagate unmodified
    async fn run(&self, command: ContainerCommand) -> Result<CommandResult, RemoteError> {
        let operation = command.as_str();
        let line = command.render(self.runtime, &self.name);
        let start_time = Instant::now();

        info!(operation = %operation, container = %self.name, "Running container operation");

        let outcome = self.executor.execute(&line).await;

        let outcome_label = match &outcome {
            Ok(result) if result.success() => CommandOutcome::Success,
            Ok(_) => CommandOutcome::NonZeroExit,
            Err(_) => CommandOutcome::Error,
        };
        record_remote_command(operation, outcome_label, start_time.elapsed().as_secs_f64());

        outcome
    }
}
