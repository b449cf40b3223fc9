use log::*;
use software_defined_hydroponics::chart::renderer::{ChartRenderer, Metric};
use software_defined_hydroponics::state::logs::LogEntry;
use software_defined_hydroponics::state::pump::{PumpCommand, PumpMode};
use software_defined_hydroponics::state::sensors::Reading;
use software_defined_hydroponics::utils::sensors::format_number;

/// What the sensor cards show for one reading
#[derive(Debug, Clone, PartialEq)]
pub struct SensorPanel {
    pub temperature: String,
    pub ph: String,
    pub ppm: String,
    /// Style class shared by the three status badges, e.g. `status warning`
    pub status_class: String,
    /// Badge text, e.g. `Warning`
    pub status_text: String,
}

impl SensorPanel {
    pub fn from_reading(reading: &Reading) -> Self {
        Self {
            temperature: one_decimal(reading.temperature),
            ph: one_decimal(reading.ph),
            ppm: reading.ppm.unwrap_or(0).to_string(),
            status_class: format!("status {}", reading.status),
            status_text: reading.status_label(),
        }
    }
}

fn one_decimal(value: f64) -> String {
    if value.is_finite() {
        format!("{:.1}", value)
    } else {
        format_number(value)
    }
}

/// Pump status text and toggle control
#[derive(Debug, Clone, PartialEq)]
pub struct PumpPanel {
    pub on: bool,
    pub mode: PumpMode,
    pub status_text: String,
    pub button_label: String,
}

impl PumpPanel {
    pub fn from_command(command: &PumpCommand) -> Self {
        Self {
            on: command.on,
            mode: command.mode,
            status_text: if command.on { "On" } else { "Off" }.to_string(),
            button_label: format!("Water pump: {}", if command.on { "ON" } else { "OFF" }),
        }
    }
}

/// The screen the dashboard projects onto
pub trait DashboardView {
    fn show_sensors(&mut self, panel: &SensorPanel);

    /// Connection indicator text
    fn set_connection(&mut self, status: &str);

    fn show_pump(&mut self, panel: &PumpPanel);

    /// Puts a new entry at the top of the log list
    fn prepend_log(&mut self, entry: &LogEntry);

    /// A one-off message for the user, e.g. nothing to export
    fn notify(&mut self, message: &str);
}

/// Headless view: every projection becomes a log line
#[derive(Debug, Default)]
pub struct ConsoleView {
    connection: String,
}

impl DashboardView for ConsoleView {
    fn show_sensors(&mut self, panel: &SensorPanel) {
        info!(
            "Temperature {} °C | pH {} | Nutrients {} ppm | Status {}",
            panel.temperature, panel.ph, panel.ppm, panel.status_text
        );
    }

    fn set_connection(&mut self, status: &str) {
        if self.connection != status {
            info!("{}", status);
            self.connection = status.to_string();
        }
    }

    fn show_pump(&mut self, panel: &PumpPanel) {
        info!("Pump: {} ({:?})", panel.status_text, panel.mode);
    }

    fn prepend_log(&mut self, entry: &LogEntry) {
        info!("[log {}] {}", entry.timestamp, entry.message);
    }

    fn notify(&mut self, message: &str) {
        warn!("{}", message);
    }
}

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Renders a metric as a one-line sparkline in the log
#[derive(Debug, Clone)]
pub struct ConsoleChart {
    metric: Metric,
    line: String,
}

impl ConsoleChart {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            line: String::new(),
        }
    }

    /// The last rendered sparkline
    pub fn line(&self) -> &str {
        &self.line
    }
}

impl ChartRenderer for ConsoleChart {
    fn redraw(&mut self, metric: Metric, labels: &[String], values: &[f64]) {
        let bounds = metric.range_policy().bounds(values);
        self.line = sparkline(values, bounds);

        match (bounds, labels.last(), values.last()) {
            (Some((min, max)), Some(label), Some(last)) => debug!(
                "{} [{}..{}] {} last {} @ {}",
                self.metric.title(),
                format_number(min),
                format_number(max),
                self.line,
                format_number(*last),
                label
            ),
            _ => debug!("{}: no data", self.metric.title()),
        }
    }
}

fn sparkline(values: &[f64], bounds: Option<(f64, f64)>) -> String {
    let Some((min, max)) = bounds else {
        return " ".repeat(values.len());
    };
    let span = max - min;

    values
        .iter()
        .map(|v| {
            if !v.is_finite() {
                return ' ';
            }
            let level = if span > 0.0 { ((v - min) / span).clamp(0.0, 1.0) } else { 0.0 };
            SPARKS[(level * (SPARKS.len() - 1) as f64).round() as usize]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use software_defined_hydroponics::state::sensors::ReadingTimestamp;

    #[test]
    fn test_sensor_panel() {
        let reading = Reading {
            temperature: 28.46,
            ph: f64::NAN,
            ppm: None,
            status: "warning".to_string(),
            timestamp: ReadingTimestamp::Missing,
        };
        let panel = SensorPanel::from_reading(&reading);

        assert_eq!(panel.temperature, "28.5");
        assert_eq!(panel.ph, "NaN");
        assert_eq!(panel.ppm, "0");
        assert_eq!(panel.status_class, "status warning");
        assert_eq!(panel.status_text, "Warning");
    }

    #[test]
    fn test_pump_panel() {
        let panel = PumpPanel::from_command(&PumpCommand {
            on: true,
            ..PumpCommand::default()
        });
        assert_eq!(panel.status_text, "On");
        assert_eq!(panel.button_label, "Water pump: ON");

        let panel = PumpPanel::from_command(&PumpCommand::default());
        assert_eq!(panel.status_text, "Off");
        assert_eq!(panel.button_label, "Water pump: OFF");
    }

    #[test]
    fn test_console_chart_sparkline() {
        let mut chart = ConsoleChart::new(Metric::Ph);
        let labels: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        chart.redraw(Metric::Ph, &labels, &[0.0, f64::NAN, 14.0]);
        assert_eq!(chart.line(), "▁ █");
    }
}
