use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::time::iso;

/// An event worth keeping: appended to the feed's log collection and mirrored on screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    /// Context such as the triggering ppm and rule, stored next to the message
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub timestamp: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            extra: Map::new(),
            timestamp: iso(at),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
