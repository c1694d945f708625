//! russh-backed transport

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect, Sig};
use russh_keys::key::{KeyPair, PublicKey};
use tracing::{debug, warn};

use super::transport::{ExecEvent, RemoteSession, Transport};
use super::RemoteError;

/// Credential presented to the remote host
#[derive(Clone)]
pub enum SshAuth {
    /// PEM/OpenSSH private key contents
    PrivateKey(String),
    Password(String),
    /// Nothing configured; every connection attempt fails authentication
    None,
}

impl fmt::Debug for SshAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshAuth::PrivateKey(_) => f.write_str("PrivateKey(<redacted>)"),
            SshAuth::Password(_) => f.write_str("Password(<redacted>)"),
            SshAuth::None => f.write_str("None"),
        }
    }
}

/// Remote session configuration, fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct SshSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: SshAuth,
    /// Expected SHA-256 host key fingerprint; any key is accepted when unset
    pub host_key_fingerprint: Option<String>,
    pub connect_timeout: Option<Duration>,
}

/// Decoded form of [`SshAuth`]
#[derive(Clone)]
enum Credential {
    Key(Arc<KeyPair>),
    Password(String),
    None,
}

/// Opens russh client connections
pub struct SshTransport {
    settings: SshSettings,
    credential: Credential,
    client_config: Arc<client::Config>,
}

impl SshTransport {
    /// Decode key material once so a bad key fails at start-up
    pub fn new(settings: SshSettings) -> Result<Self, RemoteError> {
        let credential = match &settings.auth {
            SshAuth::PrivateKey(pem) => {
                let key = russh_keys::decode_secret_key(pem, None)
                    .map_err(|e| RemoteError::Connection(format!("invalid private key: {}", e)))?;
                Credential::Key(Arc::new(key))
            }
            SshAuth::Password(password) => Credential::Password(password.clone()),
            SshAuth::None => Credential::None,
        };

        Ok(Self {
            settings,
            credential,
            client_config: Arc::new(client::Config::default()),
        })
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>, RemoteError> {
        let addr = (self.settings.host.clone(), self.settings.port);
        let handler = HostKeyCheck {
            expected: self.settings.host_key_fingerprint.clone(),
        };

        let connecting = client::connect(self.client_config.clone(), addr, handler);
        let handle = match self.settings.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connecting)
                .await
                .map_err(|_| RemoteError::Connection(format!("timed out after {:?}", limit)))?,
            None => connecting.await,
        }
        .map_err(|e| {
            RemoteError::Connection(format!(
                "{}:{}: {}",
                self.settings.host, self.settings.port, e
            ))
        })?;

        Ok(Box::new(SshSession {
            handle,
            username: self.settings.username.clone(),
            credential: self.credential.clone(),
            channel: None,
            pending: VecDeque::new(),
        }))
    }
}

/// Verifies the server key against the configured fingerprint
struct HostKeyCheck {
    expected: Option<String>,
}

#[async_trait]
impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        debug!(fingerprint = %fingerprint, "Remote host key");

        match &self.expected {
            Some(expected) if !fingerprint_matches(expected, &fingerprint) => {
                warn!(expected = %expected, actual = %fingerprint, "Host key fingerprint mismatch");
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}

/// Compare fingerprints, tolerating an `SHA256:` prefix on the configured value
fn fingerprint_matches(expected: &str, actual: &str) -> bool {
    expected.strip_prefix("SHA256:").unwrap_or(expected) == actual.strip_prefix("SHA256:").unwrap_or(actual)
}

struct SshSession {
    handle: Handle<HostKeyCheck>,
    username: String,
    credential: Credential,
    channel: Option<Channel<Msg>>,
    /// Messages received while waiting for the exec reply
    pending: VecDeque<ChannelMsg>,
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn authenticate(&mut self) -> Result<(), RemoteError> {
        let accepted = match &self.credential {
            Credential::Key(key) => self
                .handle
                .authenticate_publickey(self.username.clone(), key.clone())
                .await,
            Credential::Password(password) => self
                .handle
                .authenticate_password(self.username.clone(), password.clone())
                .await,
            Credential::None => {
                return Err(RemoteError::Connection(
                    "no SSH key or password configured".into(),
                ))
            }
        }
        .map_err(|e| RemoteError::Connection(e.to_string()))?;

        if !accepted {
            return Err(RemoteError::Connection(format!(
                "authentication rejected for user {}",
                self.username
            )));
        }
        Ok(())
    }

    async fn exec(&mut self, command: &str) -> Result<(), RemoteError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| RemoteError::Execution(e.to_string()))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| RemoteError::Execution(e.to_string()))?;

        // Data may race ahead of the exec reply; keep it for next_event
        loop {
            match channel.wait().await {
                Some(ChannelMsg::Success) => break,
                Some(ChannelMsg::Failure) => {
                    return Err(RemoteError::Execution("exec request refused by server".into()))
                }
                Some(other) => self.pending.push_back(other),
                None => {
                    return Err(RemoteError::Execution(
                        "channel closed before the command started".into(),
                    ))
                }
            }
        }

        self.channel = Some(channel);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<ExecEvent> {
        loop {
            let msg = match self.pending.pop_front() {
                Some(msg) => msg,
                None => self.channel.as_mut()?.wait().await?,
            };
            if let Some(event) = to_event(msg) {
                return Some(event);
            }
        }
    }

    async fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            let _ = channel.close().await;
        }
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            debug!(error = %e, "SSH disconnect failed");
        }
    }
}

/// Map channel messages to executor events; flow-control messages are dropped
fn to_event(msg: ChannelMsg) -> Option<ExecEvent> {
    match msg {
        ChannelMsg::Data { data } => Some(ExecEvent::Stdout(data.to_vec())),
        // Extended data type 1 is SSH_EXTENDED_DATA_STDERR
        ChannelMsg::ExtendedData { data, ext: 1 } => Some(ExecEvent::Stderr(data.to_vec())),
        ChannelMsg::ExitStatus { exit_status } => Some(ExecEvent::ExitStatus(exit_status)),
        ChannelMsg::ExitSignal { signal_name, .. } => Some(ExecEvent::ExitSignal(signal_label(signal_name))),
        _ => None,
    }
}

fn signal_label(signal: Sig) -> String {
    match signal {
        Sig::Custom(name) => name,
        other => format!("{:?}", other),
    }
}
