use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::*;
use serde_json::Value;

use crate::state::feed::{FeedError, Snapshot};
use crate::state::sensors::{
    ReadingTimestamp, FIELD_PH, FIELD_PPM, FIELD_STATUS, FIELD_TEMPERATURE, FIELD_TIMESTAMP,
};
use crate::utils::sensors::{coerce_f64, format_number};
use crate::utils::time::TimeFormat;

/// Semicolon, so decimal separators can never be confused with column breaks
pub const DELIMITER: u8 = b';';

pub const HEADER: [&str; 6] = [
    "timestamp_readable",
    "timestamp_raw",
    FIELD_TEMPERATURE,
    FIELD_PH,
    FIELD_PPM,
    FIELD_STATUS,
];

/// Errors that can occur while exporting monitoring history
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The monitoring collection is empty
    #[error("no monitoring data to export")]
    NoData,

    /// I/O error creating or writing the file
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error
    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),

    /// The monitoring collection could not be read
    #[error("failed to read monitoring data: {0}")]
    Feed(#[from] FeedError),
}

/// `monitoring_2023-11-14-22-13-20.csv` for an export started at that UTC instant
pub fn csv_filename(now: DateTime<Utc>) -> String {
    format!("monitoring_{}.csv", now.format("%Y-%m-%d-%H-%M-%S"))
}

/// One exported row for a raw monitoring record
pub fn csv_row(record: &Value, format: &TimeFormat) -> [String; 6] {
    let readable = format
        .resolve(&ReadingTimestamp::from_value(record.get(FIELD_TIMESTAMP)))
        .unwrap_or_default();

    [
        format.readable(readable),
        raw_field(record.get(FIELD_TIMESTAMP)),
        number_field(record.get(FIELD_TEMPERATURE)),
        number_field(record.get(FIELD_PH)),
        number_field(record.get(FIELD_PPM)),
        match record.get(FIELD_STATUS) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        },
    ]
}

fn raw_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn number_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "0".to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => "0".to_string(),
        other => format_number(coerce_f64(other)),
    }
}

/// Writes the header and one row per record, in the order given. Returns the row count.
pub fn write_csv<W: Write>(
    records: &[&Value],
    format: &TimeFormat,
    writer: W,
) -> Result<usize, ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .terminator(csv::Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(HEADER)?;
    for record in records {
        csv_writer.write_record(csv_row(record, format))?;
    }
    csv_writer.flush()?;

    Ok(records.len())
}

/// Exports every record in a monitoring snapshot into `dir`, named after `now`
pub fn export_snapshot(
    snapshot: &Snapshot,
    format: &TimeFormat,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let records = snapshot.child_values();
    if records.is_empty() {
        return Err(ExportError::NoData);
    }

    fs::create_dir_all(dir)?;
    let path = dir.join(csv_filename(now));
    let file = BufWriter::new(File::create(&path)?);
    let rows = write_csv(&records, format, file)?;

    info!("Exported {} readings to {}", rows, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn export(records: &[Value]) -> String {
        let refs: Vec<&Value> = records.iter().collect();
        let mut out = Vec::new();
        write_csv(&refs, &TimeFormat::utc(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_export_normalizes_decimals() {
        let csv = export(&[
            json!({
                "timestamp": 1700000000000i64,
                "suhu": "28.50",
                "phAir": 6.8,
                "kadarNutrisi": 850,
                "statusSistem": "normal"
            }),
            json!({
                "timestamp": 1700000005000i64,
                "suhu": 29.1,
                "phAir": "6,9",
                "kadarNutrisi": "900",
                "statusSistem": "Warning"
            }),
        ]);

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "timestamp_readable;timestamp_raw;suhu;phAir;kadarNutrisi;statusSistem",
                "14/11/2023, 22.13.20;1700000000000;28.5;6.8;850;normal",
                "14/11/2023, 22.13.25;1700000005000;29.1;6.9;900;Warning",
            ]
        );
    }

    #[test]
    fn test_degenerate_record() {
        let csv = export(&[json!({ "suhu": "hot", "phAir": "" })]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "01/01/1970, 00.00.00;;NaN;0;0;");
    }

    #[test]
    fn test_iso_timestamp_is_readable() {
        let csv = export(&[json!({ "timestamp": "2023-11-14T22:13:20Z", "kadarNutrisi": 1 })]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "14/11/2023, 22.13.20;2023-11-14T22:13:20Z;0;0;1;");
    }

    #[test]
    fn test_status_with_delimiter_is_quoted() {
        let csv = export(&[json!({ "statusSistem": "low;check pump" })]);
        assert!(csv.lines().nth(1).unwrap().ends_with(";\"low;check pump\""));
    }

    #[test]
    fn test_filename() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(csv_filename(now), "monitoring_2023-11-14-22-13-20.csv");
    }

    #[test]
    fn test_empty_snapshot_is_rejected() {
        let snapshot = Snapshot::new("monitoring", None);
        let now = DateTime::from_timestamp_millis(0).unwrap();
        let err = export_snapshot(&snapshot, &TimeFormat::utc(), Path::new("."), now).unwrap_err();
        assert!(matches!(err, ExportError::NoData));
    }
}
