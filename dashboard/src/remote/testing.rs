//! In-memory transport for tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::transport::{ExecEvent, RemoteSession, Transport};
use super::RemoteError;

/// Step at which a scripted session fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Connect,
    Authenticate,
    Exec,
}

#[derive(Default)]
struct Record {
    connects: usize,
    closes: usize,
    executed: Vec<String>,
}

/// Replays the same scripted events for every session it opens
#[derive(Clone, Default)]
pub struct FakeTransport {
    events: Vec<ExecEvent>,
    failure: Option<Failure>,
    hang: bool,
    delay: Option<Duration>,
    record: Arc<Mutex<Record>>,
}

impl FakeTransport {
    pub fn with_events(events: Vec<ExecEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    /// Exit 0 with the given stdout
    pub fn stdout(stdout: &str) -> Self {
        Self::with_events(vec![
            ExecEvent::Stdout(stdout.as_bytes().to_vec()),
            ExecEvent::ExitStatus(0),
        ])
    }

    /// Given exit code with the given stderr
    pub fn exit(code: u32, stderr: &str) -> Self {
        Self::with_events(vec![
            ExecEvent::Stderr(stderr.as_bytes().to_vec()),
            ExecEvent::ExitStatus(code),
        ])
    }

    pub fn failing(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    /// Sessions whose command never produces an event
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// Exit 0 with the given stdout, after `delay`
    pub fn delayed(delay: Duration, stdout: &str) -> Self {
        Self {
            delay: Some(delay),
            ..Self::stdout(stdout)
        }
    }

    pub fn connect_count(&self) -> usize {
        self.record.lock().unwrap().connects
    }

    pub fn close_count(&self) -> usize {
        self.record.lock().unwrap().closes
    }

    pub fn executed(&self) -> Vec<String> {
        self.record.lock().unwrap().executed.clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>, RemoteError> {
        if self.failure == Some(Failure::Connect) {
            return Err(RemoteError::Connection("connection refused".into()));
        }
        self.record.lock().unwrap().connects += 1;
        Ok(Box::new(FakeSession {
            events: self.events.clone().into(),
            failure: self.failure,
            hang: self.hang,
            delay: self.delay,
            record: self.record.clone(),
        }))
    }
}

struct FakeSession {
    events: VecDeque<ExecEvent>,
    failure: Option<Failure>,
    hang: bool,
    delay: Option<Duration>,
    record: Arc<Mutex<Record>>,
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn authenticate(&mut self) -> Result<(), RemoteError> {
        if self.failure == Some(Failure::Authenticate) {
            return Err(RemoteError::Connection("authentication rejected".into()));
        }
        Ok(())
    }

    async fn exec(&mut self, command: &str) -> Result<(), RemoteError> {
        if self.failure == Some(Failure::Exec) {
            return Err(RemoteError::Execution("channel open refused".into()));
        }
        self.record.lock().unwrap().executed.push(command.to_string());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<ExecEvent> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay.take() {
            tokio::time::sleep(delay).await;
        }
        self.events.pop_front()
    }

    async fn close(&mut self) {
        self.record.lock().unwrap().closes += 1;
    }
}
