//! Single-shot remote command execution

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::transport::{ExecEvent, RemoteSession, Transport};
use super::{CommandResult, RemoteError};

/// Runs one command per remote session
#[derive(Clone)]
pub struct RemoteExecutor {
    transport: Arc<dyn Transport>,
    /// Upper bound on authenticate + exec + drain; `None` waits forever
    command_timeout: Option<Duration>,
}

impl RemoteExecutor {
    pub fn new(transport: Arc<dyn Transport>, command_timeout: Option<Duration>) -> Self {
        Self {
            transport,
            command_timeout,
        }
    }

    /// Open a session, run `command`, collect its output and close the session.
    ///
    /// The command line is sent as-is; callers own its safety.
    pub async fn execute(&self, command: &str) -> Result<CommandResult, RemoteError> {
        let execution_id = Uuid::new_v4();
        let start_time = Instant::now();

        debug!(execution_id = %execution_id, command = %command, "Opening remote session");

        let mut session = self.transport.connect().await.map_err(|e| {
            warn!(execution_id = %execution_id, error = %e, "Remote connection failed");
            e
        })?;

        let outcome = match self.command_timeout {
            Some(limit) => tokio::time::timeout(limit, run(session.as_mut(), command))
                .await
                .unwrap_or_else(|_| Err(RemoteError::Timeout(limit))),
            None => run(session.as_mut(), command).await,
        };

        session.close().await;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        match &outcome {
            Ok(result) => info!(
                execution_id = %execution_id,
                exit_code = ?result.exit_code,
                signal = ?result.signal,
                duration_ms = duration_ms,
                "Remote command completed"
            ),
            Err(e) => warn!(
                execution_id = %execution_id,
                error = %e,
                duration_ms = duration_ms,
                "Remote command failed"
            ),
        }

        outcome
    }
}

/// Authenticate, start the command and drain the channel until it closes
async fn run(session: &mut dyn RemoteSession, command: &str) -> Result<CommandResult, RemoteError> {
    session.authenticate().await?;
    session.exec(command).await?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_code = None;
    let mut signal = None;

    while let Some(event) = session.next_event().await {
        match event {
            ExecEvent::Stdout(data) => stdout.extend_from_slice(&data),
            ExecEvent::Stderr(data) => stderr.extend_from_slice(&data),
            ExecEvent::ExitStatus(code) => exit_code = Some(code as i32),
            ExecEvent::ExitSignal(name) => signal = Some(name),
        }
    }

    Ok(CommandResult {
        exit_code,
        signal,
        stdout: String::from_utf8_lossy(&stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
    })
}
