//! Transport abstraction between the executor and the SSH library
//!
//! The executor drives a session through three ordered steps
//! (authenticate, exec, drain events) and always closes it afterwards.
//! Keeping those steps behind a trait lets the executor be exercised
//! without a live SSH server.

use async_trait::async_trait;

use super::RemoteError;

/// Event observed on the channel of a running remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecEvent {
    /// Bytes on the command's standard output
    Stdout(Vec<u8>),
    /// Bytes on the command's standard error
    Stderr(Vec<u8>),
    /// Command exited normally with this status
    ExitStatus(u32),
    /// Command was terminated by this signal
    ExitSignal(String),
}

/// Opens connections to the remote host
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish a connection (TCP + protocol handshake), not yet authenticated
    async fn connect(&self) -> Result<Box<dyn RemoteSession>, RemoteError>;
}

/// One connected remote session
#[async_trait]
pub trait RemoteSession: Send {
    /// Authenticate with the configured credential
    async fn authenticate(&mut self) -> Result<(), RemoteError>;

    /// Request execution of a command line
    async fn exec(&mut self, command: &str) -> Result<(), RemoteError>;

    /// Next channel event, `None` once the channel has closed
    async fn next_event(&mut self) -> Option<ExecEvent>;

    /// Tear down the session
    async fn close(&mut self);
}
