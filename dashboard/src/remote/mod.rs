//! Remote command execution over SSH
//!
//! Every call to [`RemoteExecutor::execute`] opens its own session, runs a
//! single command line, collects stdout/stderr/exit status and closes the
//! session again. There is no pooling and no retry.

mod executor;
mod ssh;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use thiserror::Error;

pub use executor::RemoteExecutor;
pub use ssh::{SshAuth, SshSettings, SshTransport};
pub use transport::{ExecEvent, RemoteSession, Transport};

/// Captured outcome of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit status, absent when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Terminating signal name, if any
    pub signal: Option<String>,
    /// Trimmed standard output
    pub stdout: String,
    /// Trimmed standard error
    pub stderr: String,
}

impl CommandResult {
    /// Exit code 0 is success, anything else (including a signal) is failure
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Remote execution failures
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Session could not be established or authenticated
    #[error("SSH connection failed: {0}")]
    Connection(String),

    /// Session was open but the command could not be started
    #[error("Remote command could not be started: {0}")]
    Execution(String),

    /// Configured command timeout elapsed
    #[error("Remote command timed out after {0:?}")]
    Timeout(Duration),
}
