//! Interpretation of the container listing output

use chrono::Utc;

use crate::models::{ContainerState, ContainerStatus};
use crate::remote::CommandResult;

/// Marker the engine uses for a live container ("Up 3 hours")
const RUNNING_MARKER: &str = "Up";
/// Marker the engine uses for a finished container ("Exited (0) 2 days ago")
const STOPPED_MARKER: &str = "Exited";

/// Map a status listing to a [`ContainerStatus`] observed now.
///
/// Positional heuristic over the `NAMES\tSTATUS\tPORTS` table: a change in
/// the engine's column order or vocabulary degrades to `unknown`.
pub fn interpret(raw: &CommandResult, container_name: &str) -> ContainerStatus {
    let (state, ports) = parse_listing(&raw.stdout);
    ContainerStatus {
        state,
        ports,
        container_name: container_name.to_string(),
        observed_at: Utc::now(),
    }
}

/// State and port listing from the first data row of the table
pub fn parse_listing(stdout: &str) -> (ContainerState, String) {
    let lines: Vec<&str> = stdout.split('\n').collect();
    if lines.len() < 2 {
        return (ContainerState::NotFound, String::new());
    }

    let row = lines[1];
    let state = if row.contains(RUNNING_MARKER) {
        ContainerState::Running
    } else if row.contains(STOPPED_MARKER) {
        ContainerState::Stopped
    } else {
        ContainerState::Unknown
    };

    let ports = row.split('\t').nth(2).unwrap_or_default().to_string();
    (state, ports)
}
