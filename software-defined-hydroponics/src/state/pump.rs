use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::time::iso;

/// Who issued a pump command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PumpMode {
    #[default]
    Auto,
    Manual,
}

/// The document stored at the pump path. Always written whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpCommand {
    #[serde(default)]
    pub on: bool,
    #[serde(default)]
    pub mode: PumpMode,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PumpCommand {
    pub fn new(on: bool, mode: PumpMode, at: DateTime<Utc>, note: impl Into<String>) -> Self {
        let note = note.into();
        Self {
            on,
            mode,
            updated_at: iso(at),
            note: if note.is_empty() { None } else { Some(note) },
        }
    }

    /// Reads whatever is stored at the pump path. A missing or unreadable document means
    /// the pump is off under automatic control.
    pub fn from_value(value: Option<&Value>) -> Self {
        value
            .filter(|v| !v.is_null())
            .and_then(|v| match serde_json::from_value::<PumpCommand>(v.clone()) {
                Ok(command) => Some(command),
                Err(_) => Some(PumpCommand {
                    on: v.get("on").map(truthy).unwrap_or(false),
                    ..PumpCommand::default()
                }),
            })
            .unwrap_or_default()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Default for PumpCommand {
    fn default() -> Self {
        Self {
            on: false,
            mode: PumpMode::Auto,
            updated_at: String::new(),
            note: None,
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

/// The last command the automatic controller issued during this session.
///
/// Lives only in memory: a restart begins at `Unset` and re-evaluates from the next
/// reading, possibly repeating a command the pump already follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoDecision {
    #[default]
    Unset,
    On,
    Off,
}

/// What the controller wants done with the pump after looking at one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpAction {
    On,
    Off,
    /// Keep whatever the pump is doing
    Hold,
}

impl PumpAction {
    /// The requested pump state, if any
    pub fn target(self) -> Option<bool> {
        match self {
            PumpAction::On => Some(true),
            PumpAction::Off => Some(false),
            PumpAction::Hold => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_command_wire_format() {
        let command = PumpCommand::new(true, PumpMode::Auto, at(), "AUTO: ppm 600 < 750");
        assert_eq!(
            command.to_value(),
            json!({
                "on": true,
                "mode": "AUTO",
                "updatedAt": "2023-11-14T22:13:20.000Z",
                "note": "AUTO: ppm 600 < 750"
            })
        );
    }

    #[test]
    fn test_empty_note_is_omitted() {
        let command = PumpCommand::new(false, PumpMode::Manual, at(), "");
        assert_eq!(
            command.to_value(),
            json!({ "on": false, "mode": "MANUAL", "updatedAt": "2023-11-14T22:13:20.000Z" })
        );
    }

    #[test]
    fn test_missing_document_defaults_to_off_auto() {
        assert_eq!(PumpCommand::from_value(None), PumpCommand::default());
        assert_eq!(PumpCommand::from_value(Some(&Value::Null)), PumpCommand::default());
    }

    #[test]
    fn test_loose_document_still_reports_state() {
        let command = PumpCommand::from_value(Some(&json!({ "on": 1, "mode": "REMOTE" })));
        assert!(command.on);
        assert_eq!(command.mode, PumpMode::Auto);
    }
}
