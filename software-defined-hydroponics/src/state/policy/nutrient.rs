use serde::{Deserialize, Serialize};

/// What a reading without a usable nutrient value means to the pump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPpm {
    /// Treat it as 0 PPM. Below the low threshold, so it can switch the pump on.
    #[default]
    Zero,
    /// Ignore the reading for pump control
    Skip,
}

/// Thresholds for the nutrient pump. Can be overridden from the `[policy]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutrientPolicyConfigs {
    /// The pump is switched on when the concentration drops below this (PPM)
    pub low_ppm: u32,

    /// The pump is switched off when the concentration rises above this (PPM).
    /// Values between the two thresholds are the dead band and never trigger a command.
    pub high_ppm: u32,

    /// How to treat readings whose nutrient value is absent or unparseable
    pub missing_ppm: MissingPpm,
}

impl NutrientPolicyConfigs {
    /// The value handed to the hysteresis controller for a reading's PPM
    pub fn effective_ppm(&self, ppm: Option<u32>) -> Option<f64> {
        match (ppm, self.missing_ppm) {
            (Some(ppm), _) => Some(ppm as f64),
            (None, MissingPpm::Zero) => Some(0.0),
            (None, MissingPpm::Skip) => None,
        }
    }
}

impl Default for NutrientPolicyConfigs {
    fn default() -> Self {
        Self {
            low_ppm: 750,
            high_ppm: 1150,
            missing_ppm: MissingPpm::Zero,
        }
    }
}
