use crate::chart::renderer::Metric;
use crate::state::sensors::Reading;
use crate::utils::time::TimeFormat;

/// Number of points kept on each chart
pub const MAX_DATA_POINTS: usize = 20;

/// Label used when a historical reading carries no usable timestamp
pub const UNKNOWN_LABEL: &str = "--.--.--";

/// Rolling window of the most recent readings, shared by the three charts.
///
/// Labels and the three value sequences always have the same length. Appending past
/// capacity drops the oldest point from all four at once, so index `i` refers to the same
/// sample everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingChartBuffer {
    capacity: usize,
    labels: Vec<String>,
    temperature: Vec<f64>,
    ph: Vec<f64>,
    ppm: Vec<f64>,
}

impl SlidingChartBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            labels: Vec::with_capacity(capacity + 1),
            temperature: Vec::with_capacity(capacity + 1),
            ph: Vec::with_capacity(capacity + 1),
            ppm: Vec::with_capacity(capacity + 1),
        }
    }

    pub fn append(&mut self, label: impl Into<String>, temperature: f64, ph: f64, ppm: f64) {
        self.labels.push(label.into());
        self.temperature.push(temperature);
        self.ph.push(ph);
        self.ppm.push(ppm);
        self.evict();
    }

    /// Replaces the whole window with historical readings, oldest first.
    ///
    /// Only the newest `capacity` entries are kept if more are given.
    pub fn bulk_load(&mut self, entries: &[Reading], format: &TimeFormat) {
        self.labels.clear();
        self.temperature.clear();
        self.ph.clear();
        self.ppm.clear();

        let skip = entries.len().saturating_sub(self.capacity);
        for reading in &entries[skip..] {
            let label = format
                .resolve(&reading.timestamp)
                .map(|at| format.chart_label(at))
                .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
            self.labels.push(label);
            self.temperature.push(reading.temperature);
            self.ph.push(reading.ph);
            self.ppm.push(reading.ppm.unwrap_or(0) as f64);
        }
    }

    fn evict(&mut self) {
        if self.labels.len() > self.capacity {
            let excess = self.labels.len() - self.capacity;
            self.labels.drain(..excess);
            self.temperature.drain(..excess);
            self.ph.drain(..excess);
            self.ppm.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Ph => &self.ph,
            Metric::Ppm => &self.ppm,
        }
    }
}

impl Default for SlidingChartBuffer {
    fn default() -> Self {
        Self::new(MAX_DATA_POINTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::sensors::ReadingTimestamp;

    fn reading(ms: i64, temperature: f64, ph: f64, ppm: Option<u32>) -> Reading {
        Reading {
            temperature,
            ph,
            ppm,
            status: "normal".to_string(),
            timestamp: ReadingTimestamp::Millis(ms),
        }
    }

    #[test]
    fn test_append_past_capacity_evicts_oldest_everywhere() {
        let mut buffer = SlidingChartBuffer::default();
        for i in 0..=MAX_DATA_POINTS {
            buffer.append(format!("t{}", i), i as f64, 6.5, 800.0 + i as f64);
        }

        assert_eq!(buffer.len(), MAX_DATA_POINTS);
        assert_eq!(buffer.labels().len(), MAX_DATA_POINTS);
        for metric in Metric::ALL {
            assert_eq!(buffer.values(metric).len(), MAX_DATA_POINTS);
        }

        assert_eq!(buffer.labels()[0], "t1");
        assert_eq!(buffer.values(Metric::Temperature)[0], 1.0);
        assert_eq!(buffer.values(Metric::Ppm)[0], 801.0);
        assert_eq!(buffer.labels()[MAX_DATA_POINTS - 1], "t20");
        assert_eq!(buffer.values(Metric::Temperature)[MAX_DATA_POINTS - 1], 20.0);
    }

    #[test]
    fn test_bulk_load_keeps_input_order() {
        let mut buffer = SlidingChartBuffer::default();
        buffer.append("stale", 1.0, 1.0, 1.0);

        let entries = vec![
            reading(1_700_000_000_000, 28.5, 6.8, Some(850)),
            reading(1_700_000_005_000, 29.1, 6.9, Some(900)),
            reading(1_700_000_010_000, 29.0, 7.0, None),
        ];
        buffer.bulk_load(&entries, &TimeFormat::utc());

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.labels(), ["22.13.20", "22.13.25", "22.13.30"]);
        assert_eq!(buffer.values(Metric::Temperature), [28.5, 29.1, 29.0]);
        assert_eq!(buffer.values(Metric::Ppm), [850.0, 900.0, 0.0]);
    }

    #[test]
    fn test_bulk_load_beyond_capacity_keeps_newest() {
        let mut buffer = SlidingChartBuffer::new(2);
        let entries: Vec<Reading> = (0..5)
            .map(|i| reading(1_700_000_000_000 + i * 1000, i as f64, 7.0, Some(800)))
            .collect();
        buffer.bulk_load(&entries, &TimeFormat::utc());

        assert_eq!(buffer.values(Metric::Temperature), [3.0, 4.0]);
        assert_eq!(buffer.labels(), ["22.13.23", "22.13.24"]);
    }

    #[test]
    fn test_unresolvable_timestamp_gets_placeholder_label() {
        let mut buffer = SlidingChartBuffer::default();
        let mut entry = reading(0, 25.0, 7.0, Some(900));
        entry.timestamp = ReadingTimestamp::Missing;
        buffer.bulk_load(&[entry], &TimeFormat::utc());
        assert_eq!(buffer.labels(), [UNKNOWN_LABEL]);
    }
}
