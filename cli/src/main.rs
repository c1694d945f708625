//! vpnctl - command-line client for the VPN dashboard
//!
//! Talks to the dashboard REST API: logs in, queries status, controls the
//! container and tails its logs.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// vpnctl - Monitor and control the remote OpenVPN container
#[derive(Parser)]
#[command(name = "vpnctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the VPN dashboard", long_about = None)]
struct Cli {
    /// Dashboard API URL
    #[arg(short, long, env = "VPNCTL_API_URL", default_value = "http://127.0.0.1:3000")]
    api_url: String,

    /// Token from a previous `vpnctl login`; logs in with the credentials when absent
    #[arg(short, long, env = "VPNCTL_TOKEN")]
    token: Option<String>,

    /// Dashboard username
    #[arg(short, long, env = "VPNCTL_USERNAME", default_value = "admin")]
    username: String,

    /// Dashboard password
    #[arg(short, long, env = "VPNCTL_PASSWORD", default_value = "admin", hide_env_values = true)]
    password: String,

    /// Print raw JSON responses
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the API token
    Login,

    /// Show the container status
    Status,

    /// Start the container
    Start,

    /// Stop the container
    Stop,

    /// Restart the container
    Restart,

    /// Show the last lines of the container log
    Logs {
        /// Number of lines to fetch
        #[arg(short = 'n', long, default_value = "50")]
        lines: u32,
    },

    /// Poll the container status until interrupted
    Watch {
        /// Seconds between polls
        #[arg(short, long, default_value = "30")]
        interval: u64,
    },

    /// Get server health status
    Health,
}

/// Non-success response from the dashboard
#[derive(Debug, Error)]
enum ApiFailure {
    #[error("{error} ({status})")]
    Status {
        status: reqwest::StatusCode,
        error: String,
    },
    #[error("{error}: {details} ({status})")]
    Detailed {
        status: reqwest::StatusCode,
        error: String,
        details: String,
    },
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: String,
    ports: String,
    container_name: String,
    timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActionResponse {
    success: bool,
    message: String,
    output: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LogsResponse {
    logs: String,
    timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    container_name: String,
}

/// Thin wrapper over the dashboard REST API
struct Dashboard {
    client: Client,
    api_url: String,
    username: String,
    password: String,
    token: Option<String>,
}

impl Dashboard {
    fn new(cli: &Cli) -> Self {
        Self {
            client: Client::new(),
            api_url: cli.api_url.trim_end_matches('/').to_string(),
            username: cli.username.clone(),
            password: cli.password.clone(),
            token: cli.token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn login(&mut self) -> Result<String> {
        let response = self
            .client
            .post(self.url("/api/login"))
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .context("Failed to send login request")?;

        let login: LoginResponse = parse(response)?;
        self.token = Some(login.token.clone());
        Ok(login.token)
    }

    fn token(&mut self) -> Result<String> {
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => self.login(),
        }
    }

    fn authorized(&mut self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token()?;
        Ok(request.header("Authorization", format!("Bearer {}", token)))
    }

    fn status(&mut self) -> Result<StatusResponse> {
        let request = self.authorized(self.client.get(self.url("/api/vpn/status")))?;
        parse(request.send().context("Failed to query status")?)
    }

    fn control(&mut self, action: &str) -> Result<ActionResponse> {
        let path = format!("/api/vpn/{}", action);
        let request = self.authorized(self.client.post(self.url(&path)))?;
        parse(
            request
                .send()
                .with_context(|| format!("Failed to {} the container", action))?,
        )
    }

    fn logs(&mut self, lines: u32) -> Result<LogsResponse> {
        let request = self.authorized(
            self.client
                .get(self.url("/api/vpn/logs"))
                .query(&[("lines", lines)]),
        )?;
        parse(request.send().context("Failed to fetch logs")?)
    }

    fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .context("Failed to get health")?;
        parse(response)
    }
}

/// Decode a success body, or turn the dashboard's error body into an `ApiFailure`
fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response.json().context("Failed to parse response");
    }

    let text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
    Err(api_failure(status, &text).into())
}

fn api_failure(status: reqwest::StatusCode, body: &str) -> ApiFailure {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error,
            details: Some(details),
        }) if !details.is_empty() => ApiFailure::Detailed {
            status,
            error,
            details,
        },
        Ok(ErrorResponse { error, .. }) => ApiFailure::Status { status, error },
        Err(_) => ApiFailure::Status {
            status,
            error: if body.is_empty() {
                "Request failed".to_string()
            } else {
                body.to_string()
            },
        },
    }
}

fn colored_state(state: &str) -> ColoredString {
    match state {
        "running" => state.green().bold(),
        "stopped" => state.red().bold(),
        "not_found" => state.yellow().bold(),
        _ => state.bright_black().bold(),
    }
}

fn print_status(status: &StatusResponse) {
    println!("{}", "VPN Container Status".bright_cyan().bold());
    println!("{}", "=".repeat(40).bright_blue());
    println!("{} {}", "Container:".cyan(), status.container_name);
    println!("{} {}", "Status:".cyan(), colored_state(&status.status));
    if !status.ports.is_empty() {
        println!("{} {}", "Ports:".cyan(), status.ports);
    }
    println!("{} {}", "Checked:".cyan(), status.timestamp);
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn control(dashboard: &mut Dashboard, action: &str, json: bool) -> Result<()> {
    let result = dashboard.control(action)?;
    if json {
        return print_json(&result);
    }

    println!("{} {}", "✓".green(), result.message);
    if !result.output.is_empty() {
        println!("{} {}", "  Output:".cyan(), result.output);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut dashboard = Dashboard::new(&cli);

    match cli.command {
        Commands::Login => {
            let token = dashboard.login()?;
            if cli.json {
                println!("{}", serde_json::json!({ "token": token }));
            } else {
                println!("{} {}", "✓ Logged in as".green(), cli.username);
                println!("{} {}", "  Token:".cyan(), token);
                println!("  export VPNCTL_TOKEN={}", token);
            }
        }

        Commands::Status => {
            let status = dashboard.status()?;
            if cli.json {
                print_json(&status)?;
            } else {
                print_status(&status);
            }
        }

        Commands::Start => control(&mut dashboard, "start", cli.json)?,
        Commands::Stop => control(&mut dashboard, "stop", cli.json)?,
        Commands::Restart => control(&mut dashboard, "restart", cli.json)?,

        Commands::Logs { lines } => {
            let logs = dashboard.logs(lines)?;
            if cli.json {
                print_json(&logs)?;
            } else if logs.logs.is_empty() {
                println!("{}", "No log output".yellow());
            } else {
                println!("{}", logs.logs);
            }
        }

        Commands::Watch { interval } => {
            let interval = Duration::from_secs(interval.max(1));
            let mut last_state: Option<String> = None;
            loop {
                match dashboard.status() {
                    Ok(status) => {
                        if cli.json {
                            println!("{}", serde_json::to_string(&status)?);
                        } else {
                            let changed = last_state.as_deref() != Some(status.status.as_str());
                            let marker = if changed { "*".bright_yellow() } else { " ".normal() };
                            println!(
                                "{} {} {} {}",
                                marker,
                                status.timestamp.bright_black(),
                                colored_state(&status.status),
                                status.ports
                            );
                        }
                        last_state = Some(status.status);
                    }
                    Err(e) => eprintln!("{} {:#}", "✗ Status check failed:".red(), e),
                }
                thread::sleep(interval);
            }
        }

        Commands::Health => {
            let health = dashboard.health()?;
            if cli.json {
                print_json(&health)?;
            } else {
                println!("{}", "VPN Dashboard Status".bright_cyan().bold());
                println!("{}", "=".repeat(40).bright_blue());
                println!(
                    "{} {}",
                    "Status:".cyan(),
                    if health.status == "ok" {
                        health.status.green()
                    } else {
                        health.status.yellow()
                    }
                );
                println!("{} {}", "Version:".cyan(), health.version);
                println!("{} {}s", "Uptime:".cyan(), health.uptime_seconds);
                println!("{} {}", "Container:".cyan(), health.container_name);
            }
        }
    }

    Ok(())
}
