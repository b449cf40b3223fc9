use std::path::Path;

use chrono::{DateTime, FixedOffset};
use crossbeam_channel::Sender;
use feed_abstraction::MemoryFeed;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use software_defined_hydroponics::chart::renderer::ChartRenderer;
use software_defined_hydroponics::state::feed::Query;
use software_defined_hydroponics::state::pump::PumpCommand;
use software_defined_hydroponics::state::traits::RealtimeFeed;
use software_defined_hydroponics::utils::time::Clock;

use crate::dashboard::dashboard::Dashboard;
use crate::mqtt::mqtt::Topics;
use crate::view::view::DashboardView;

/// Requests a user (or another client) can send on the commands topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum DashboardCommand {
    /// Flip the pump manually
    TogglePump,
    /// Write the monitoring history to a CSV file
    ExportCsv,
}

/// Handler for everything arriving from the broker
pub fn handle_message(
    topic: &str,
    payload: &str,
    feed: &MemoryFeed,
    topics: &Topics,
    commands: &Sender<DashboardCommand>,
) {
    if topic == topics.monitoring {
        handle_reading(payload, feed, &topics.paths().monitoring);
    } else if topic == topics.pump {
        handle_pump_state(payload, feed, &topics.paths().pump);
    } else if topic == topics.commands {
        match serde_json::from_str::<DashboardCommand>(payload) {
            Ok(command) => {
                info!("Received command: {:?}", command);
                if commands.send(command).is_err() {
                    warn!("Dispatcher stopped, dropping {:?}", command);
                }
            }
            Err(e) => {
                error!("Failed to parse command: {}", e);
            }
        }
    } else {
        warn!("Ignoring message on unexpected topic \"{}\"", topic);
    }
}

/// A device published a new sample: append it to the monitoring collection
fn handle_reading(payload: &str, feed: &MemoryFeed, path: &str) {
    match serde_json::from_str::<Value>(payload) {
        Ok(record @ Value::Object(_)) => {
            if let Err(e) = feed.push(path, record) {
                error!("Failed to store reading: {}", e);
            }
        }
        Ok(other) => {
            error!("Reading is not an object: {}", other);
        }
        Err(e) => {
            error!("Failed to parse sensor reading: {}", e);
        }
    }
}

/// Someone (possibly us, echoed back by the broker) wrote the pump document.
///
/// Echoes of our own publishes can arrive after we have written again, so a document
/// stamped earlier than the local one is dropped.
fn handle_pump_state(payload: &str, feed: &MemoryFeed, path: &str) {
    let incoming = if payload.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse pump state: {}", e);
                return;
            }
        }
    };

    let current = match feed.once(Query::path(path)) {
        Ok(snapshot) => snapshot.value().cloned().unwrap_or(Value::Null),
        Err(e) => {
            error!("Failed to read pump state: {}", e);
            return;
        }
    };

    if current == incoming {
        return;
    }
    if let (Some(incoming_at), Some(current_at)) = (updated_at(&incoming), updated_at(&current)) {
        if incoming_at < current_at {
            debug!("Ignoring stale pump state from {}", incoming_at);
            return;
        }
    }

    if let Err(e) = feed.set(path, incoming) {
        error!("Failed to store pump state: {}", e);
    }
}

fn updated_at(document: &Value) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&PumpCommand::from_value(Some(document)).updated_at).ok()
}

/// Runs a command against the dashboard and returns the response to publish
pub fn handle_command<F, V, R, C>(
    command: DashboardCommand,
    dashboard: &mut Dashboard<F, V, R, C>,
    export_dir: &Path,
) -> String
where
    F: RealtimeFeed + Clone,
    V: DashboardView,
    R: ChartRenderer,
    C: Clock,
{
    let response = match command {
        DashboardCommand::TogglePump => match dashboard.toggle_pump() {
            Ok(written) => CommandResponse::ok(format!(
                "pump {}",
                if written.on { "ON" } else { "OFF" }
            )),
            Err(e) => {
                error!("Manual toggle failed: {}", e);
                CommandResponse::error(e.to_string())
            }
        },
        DashboardCommand::ExportCsv => match dashboard.export_csv(export_dir) {
            Ok(path) => CommandResponse::ok(path.display().to_string()),
            Err(e) => {
                error!("CSV export failed: {}", e);
                CommandResponse::error(e.to_string())
            }
        },
    };

    serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"status":"error","message":"unserializable response"}"#.to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    pub status: &'static str,
    pub message: String,
}

impl CommandResponse {
    fn ok(message: String) -> Self {
        Self {
            status: "ok",
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error",
            message,
        }
    }
}
