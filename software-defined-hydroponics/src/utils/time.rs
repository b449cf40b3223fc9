use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, Utc};

use crate::state::sensors::ReadingTimestamp;

/// Source of "now" for everything that stamps commands, logs and chart labels
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g. `2023-11-14T22:13:20.000Z`
pub fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Renders instants in the rig's local time.
///
/// The rig runs in a fixed zone (no DST), so a plain UTC offset is enough. Formats follow
/// the dashboard's locale: `HH.MM.SS` for chart labels and `dd/mm/yyyy, HH.MM.SS` for
/// human readable timestamps.
#[derive(Debug, Clone, Copy)]
pub struct TimeFormat {
    offset: FixedOffset,
}

impl TimeFormat {
    /// Offsets outside +/-24h fall back to UTC
    pub fn new(utc_offset_minutes: i32) -> Self {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn chart_label(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%H.%M.%S").to_string()
    }

    pub fn readable(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format("%d/%m/%Y, %H.%M.%S")
            .to_string()
    }

    /// Resolves a reading timestamp to an instant. Epoch-millis and RFC 3339 text are
    /// understood; numeric text is treated as epoch-millis.
    pub fn resolve(&self, timestamp: &ReadingTimestamp) -> Option<DateTime<Utc>> {
        match timestamp {
            ReadingTimestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            ReadingTimestamp::Text(text) => {
                let text = text.trim();
                if let Ok(ms) = text.parse::<i64>() {
                    return DateTime::from_timestamp_millis(ms);
                }
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            ReadingTimestamp::Missing => None,
        }
    }

    /// Text for the connection indicator: large epoch-millis values are rendered as a
    /// readable date, anything else is shown verbatim.
    pub fn status_stamp(&self, timestamp: &ReadingTimestamp) -> String {
        match timestamp {
            ReadingTimestamp::Millis(ms) if *ms > 1_000_000_000_000 => {
                match DateTime::from_timestamp_millis(*ms) {
                    Some(at) => self.readable(at),
                    None => ms.to_string(),
                }
            }
            ReadingTimestamp::Millis(ms) => ms.to_string(),
            ReadingTimestamp::Text(text) => text.clone(),
            ReadingTimestamp::Missing => "-".to_string(),
        }
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self::utc()
    }
}
