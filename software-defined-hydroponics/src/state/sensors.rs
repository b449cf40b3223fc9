use serde_json::Value;

use crate::utils::sensors::{coerce_f64, round_ppm};

/// Field names used by the rig firmware when it publishes a sample
pub const FIELD_TEMPERATURE: &str = "suhu";
pub const FIELD_PH: &str = "phAir";
pub const FIELD_PPM: &str = "kadarNutrisi";
pub const FIELD_STATUS: &str = "statusSistem";
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// When the sample was taken, as published by the device
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingTimestamp {
    /// Epoch milliseconds
    Millis(i64),
    /// Anything textual, typically ISO-8601
    Text(String),
    Missing,
}

impl ReadingTimestamp {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => match n.as_i64() {
                Some(ms) => ReadingTimestamp::Millis(ms),
                None => n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| ReadingTimestamp::Millis(f as i64))
                    .unwrap_or(ReadingTimestamp::Missing),
            },
            Some(Value::String(s)) if !s.is_empty() => ReadingTimestamp::Text(s.clone()),
            _ => ReadingTimestamp::Missing,
        }
    }
}

/// One sensor sample from the rig.
///
/// Readings are never validated away: a malformed temperature or pH becomes `NaN` and is
/// still shown. A missing or unparseable nutrient value is kept as `None` so the pump
/// policy can decide what it means.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Water temperature (°C)
    pub temperature: f64,
    /// Water pH
    pub ph: f64,
    /// Nutrient concentration (PPM), rounded half-up and clamped at zero
    pub ppm: Option<u32>,
    /// Free-form system status, lowercased. `normal` when the device sent nothing
    pub status: String,
    pub timestamp: ReadingTimestamp,
}

impl Reading {
    pub fn from_value(record: &Value) -> Self {
        let status = match record.get(FIELD_STATUS) {
            Some(Value::String(s)) if !s.is_empty() => s.to_lowercase(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "normal".to_string(),
        };

        Self {
            temperature: coerce_f64(record.get(FIELD_TEMPERATURE)),
            ph: coerce_f64(record.get(FIELD_PH)),
            ppm: round_ppm(coerce_f64(record.get(FIELD_PPM))),
            status,
            timestamp: ReadingTimestamp::from_value(record.get(FIELD_TIMESTAMP)),
        }
    }

    /// Status with the first letter uppercased, as shown on the badges
    pub fn status_label(&self) -> String {
        let mut chars = self.status.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reading_from_mixed_record() {
        let reading = Reading::from_value(&json!({
            "suhu": "28.50",
            "phAir": 6.8,
            "kadarNutrisi": "849.6",
            "statusSistem": "WARNING",
            "timestamp": 1700000000000i64
        }));

        assert_eq!(reading.temperature, 28.5);
        assert_eq!(reading.ph, 6.8);
        assert_eq!(reading.ppm, Some(850));
        assert_eq!(reading.status, "warning");
        assert_eq!(reading.status_label(), "Warning");
        assert_eq!(reading.timestamp, ReadingTimestamp::Millis(1_700_000_000_000));
    }

    #[test]
    fn test_reading_with_missing_fields() {
        let reading = Reading::from_value(&json!({ "suhu": "n/a" }));

        assert!(reading.temperature.is_nan());
        assert!(reading.ph.is_nan());
        assert_eq!(reading.ppm, None);
        assert_eq!(reading.status, "normal");
        assert_eq!(reading.timestamp, ReadingTimestamp::Missing);
    }

    #[test]
    fn test_iso_timestamp_is_kept_as_text() {
        let reading = Reading::from_value(&json!({ "timestamp": "2023-11-14T22:13:20Z" }));
        assert_eq!(
            reading.timestamp,
            ReadingTimestamp::Text("2023-11-14T22:13:20Z".to_string())
        );
    }
}
