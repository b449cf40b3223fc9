//! TOML configuration for the dashboard service.
//!
//! Every section is optional; a missing file section falls back to the defaults below.
//!
//! ```toml
//! # hydro.toml
//! seed = "firebase-export.json"
//!
//! [mqtt]
//! host = "broker.local"
//! port = 1883
//! topic_prefix = "greenhouse-1"
//!
//! [policy]
//! low_ppm = 750
//! high_ppm = 1150
//! missing_ppm = "zero"
//!
//! [display]
//! utc_offset_minutes = 420
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use feed_abstraction::{LOGS_PATH, PUMP_PATH};
use serde::Deserialize;
use software_defined_hydroponics::chart::buffer::MAX_DATA_POINTS;
use software_defined_hydroponics::state::policy::nutrient::NutrientPolicyConfigs;

/// Root configuration structure for hydro.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// JSON export of the whole feed tree to start from
    pub seed: Option<PathBuf>,

    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub feed: FeedPaths,

    #[serde(default)]
    pub policy: NutrientPolicyConfigs,

    #[serde(default)]
    pub chart: ChartConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Every feed path is mirrored under `<topic_prefix>/<path>`
    pub topic_prefix: String,
    pub keep_alive_s: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "hydro-dashboard".to_string(),
            username: None,
            password: None,
            topic_prefix: "hydro".to_string(),
            keep_alive_s: 30,
        }
    }
}

/// Where things live in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedPaths {
    /// Append-only collection of readings
    pub monitoring: String,
    /// Single pump command document
    pub pump: String,
    /// Append-only collection of log entries
    pub logs: String,
}

impl Default for FeedPaths {
    fn default() -> Self {
        Self {
            monitoring: "monitoring".to_string(),
            pump: PUMP_PATH.to_string(),
            logs: LOGS_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Points kept per chart
    pub capacity: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_DATA_POINTS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Local time of the rig, in minutes east of UTC (WIB by default)
    pub utc_offset_minutes: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 7 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory CSV exports are written to
    pub out_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("exports"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
