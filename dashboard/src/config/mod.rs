//! Configuration module for the VPN dashboard
//!
//! Supports configuration via:
//! - `.env` file (loaded with dotenvy)
//! - Optional `config/dashboard.{toml,yaml,json}` file
//! - Environment variables (`VPN_SERVER_HOST`, `WEB_PORT`, ...)
//!
//! Everything is read once at startup into an immutable [`AppConfig`].

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::container::{ContainerName, ContainerRuntime};
use crate::remote::{SshAuth, SshSettings};

/// Main application configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote host running the container engine
    #[serde(default)]
    pub vpn_server_host: String,

    /// SSH port on the remote host
    #[serde(default = "default_ssh_port")]
    pub vpn_server_port: u16,

    /// SSH user on the remote host
    #[serde(default = "default_ssh_user")]
    pub vpn_server_user: String,

    /// Private key file; takes precedence over the password when it exists
    #[serde(default)]
    pub vpn_server_key_path: Option<PathBuf>,

    /// SSH password, used when no key file is available
    #[serde(default)]
    pub vpn_server_password: Option<String>,

    /// Expected SHA-256 fingerprint of the remote host key
    #[serde(default)]
    pub vpn_server_host_key: Option<String>,

    /// Name of the managed container
    #[serde(default = "default_container_name")]
    pub vpn_container_name: String,

    /// Container engine CLI on the remote host
    #[serde(default)]
    pub container_runtime: ContainerRuntime,

    /// Host the HTTP server binds to
    #[serde(default = "default_web_host")]
    pub web_host: String,

    /// Port the HTTP server listens on
    #[serde(default = "default_web_port")]
    pub web_port: u16,

    /// Directory holding the browser UI
    #[serde(default = "default_static_dir")]
    pub web_static_dir: PathBuf,

    /// Dashboard login user
    #[serde(default = "default_web_credential")]
    pub web_username: String,

    /// Dashboard login password
    #[serde(default = "default_web_credential")]
    pub web_password: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// SSH connection establishment timeout; unset waits forever
    #[serde(default)]
    pub ssh_connect_timeout_secs: Option<u64>,

    /// Remote command timeout; unset waits forever
    #[serde(default)]
    pub ssh_command_timeout_secs: Option<u64>,
}

// Default value functions
fn default_ssh_port() -> u16 {
    22
}

fn default_ssh_user() -> String {
    "root".to_string()
}

fn default_container_name() -> String {
    "openvpn-server".to_string()
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_web_credential() -> String {
    "admin".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vpn_server_host: String::new(),
            vpn_server_port: default_ssh_port(),
            vpn_server_user: default_ssh_user(),
            vpn_server_key_path: None,
            vpn_server_password: None,
            vpn_server_host_key: None,
            vpn_container_name: default_container_name(),
            container_runtime: ContainerRuntime::default(),
            web_host: default_web_host(),
            web_port: default_web_port(),
            web_static_dir: default_static_dir(),
            web_username: default_web_credential(),
            web_password: default_web_credential(),
            log_level: default_log_level(),
            ssh_connect_timeout_secs: None,
            ssh_command_timeout_secs: None,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("vpn_server_host", &self.vpn_server_host)
            .field("vpn_server_port", &self.vpn_server_port)
            .field("vpn_server_user", &self.vpn_server_user)
            .field("vpn_server_key_path", &self.vpn_server_key_path)
            .field("vpn_server_password", &self.vpn_server_password.as_ref().map(|_| "<redacted>"))
            .field("vpn_server_host_key", &self.vpn_server_host_key)
            .field("vpn_container_name", &self.vpn_container_name)
            .field("container_runtime", &self.container_runtime)
            .field("web_host", &self.web_host)
            .field("web_port", &self.web_port)
            .field("web_static_dir", &self.web_static_dir)
            .field("web_username", &self.web_username)
            .field("web_password", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("ssh_connect_timeout_secs", &self.ssh_connect_timeout_secs)
            .field("ssh_command_timeout_secs", &self.ssh_command_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if present
        let _ = dotenvy::dotenv();
        Self::from_env(None)
    }

    /// Build configuration, reading the process environment or `env` when given
    pub fn from_env(env: Option<HashMap<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Load from config file if present
            .add_source(config::File::with_name("config/dashboard").required(false))
            // Override with environment variables (VPN_SERVER_HOST -> vpn_server_host)
            .add_source(config::Environment::default().source(env))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.vpn_server_host.trim().is_empty() {
            anyhow::bail!("VPN_SERVER_HOST must be set");
        }

        if self.vpn_server_port == 0 {
            anyhow::bail!("SSH port cannot be 0");
        }

        if self.web_port == 0 {
            anyhow::bail!("Web port cannot be 0");
        }

        if self.web_username.is_empty() {
            anyhow::bail!("Dashboard username cannot be empty");
        }

        if self.ssh_connect_timeout_secs == Some(0) || self.ssh_command_timeout_secs == Some(0) {
            anyhow::bail!("SSH timeouts cannot be 0; leave them unset to disable");
        }

        self.container_name()?;

        Ok(())
    }

    /// Validated name of the managed container
    pub fn container_name(&self) -> Result<ContainerName> {
        ContainerName::parse(&self.vpn_container_name).map_err(anyhow::Error::from)
    }

    /// Resolve the SSH credential: an existing key file wins over the password
    pub fn ssh_auth(&self) -> Result<SshAuth> {
        if let Some(path) = &self.vpn_server_key_path {
            if path.exists() {
                let pem = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read SSH key: {}", path.display()))?;
                return Ok(SshAuth::PrivateKey(pem));
            }
            warn!(path = %path.display(), "SSH key file not found, falling back to password");
        }

        Ok(match self.vpn_server_password.as_deref() {
            Some(password) if !password.is_empty() => SshAuth::Password(password.to_string()),
            _ => SshAuth::None,
        })
    }

    /// Remote session settings with the credential resolved
    pub fn ssh_settings(&self) -> Result<SshSettings> {
        Ok(SshSettings {
            host: self.vpn_server_host.clone(),
            port: self.vpn_server_port,
            username: self.vpn_server_user.clone(),
            auth: self.ssh_auth()?,
            host_key_fingerprint: self.vpn_server_host_key.clone(),
            connect_timeout: self.ssh_connect_timeout_secs.map(Duration::from_secs),
        })
    }

    /// Remote command timeout policy
    pub fn command_timeout(&self) -> Option<Duration> {
        self.ssh_command_timeout_secs.map(Duration::from_secs)
    }
}
