use std::path::{Path, PathBuf};

use feed_abstraction::{FeedEventLog, FeedPump};
use log::*;
use software_defined_hydroponics::chart::buffer::SlidingChartBuffer;
use software_defined_hydroponics::chart::renderer::{ChartRenderer, ChartSet, Metric};
use software_defined_hydroponics::controller::controller::{Decision, PumpHysteresisController};
use software_defined_hydroponics::export::csv::{export_snapshot, ExportError};
use software_defined_hydroponics::state::feed::{FeedError, Query, Snapshot};
use software_defined_hydroponics::state::policy::nutrient::NutrientPolicyConfigs;
use software_defined_hydroponics::state::pump::PumpCommand;
use software_defined_hydroponics::state::sensors::Reading;
use software_defined_hydroponics::state::traits::RealtimeFeed;
use software_defined_hydroponics::utils::time::{Clock, TimeFormat};

use crate::config::config::{Config, FeedPaths};
use crate::view::view::{DashboardView, PumpPanel, SensorPanel};

/// Everything the dashboard needs to know up front
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub paths: FeedPaths,
    pub policy: NutrientPolicyConfigs,
    pub chart_capacity: usize,
    pub format: TimeFormat,
}

impl From<&Config> for DashboardSettings {
    fn from(config: &Config) -> Self {
        Self {
            paths: config.feed.clone(),
            policy: config.policy.clone(),
            chart_capacity: config.chart.capacity,
            format: TimeFormat::new(config.display.utc_offset_minutes),
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

pub type FeedController<F> = PumpHysteresisController<FeedPump<F>, FeedEventLog<F>>;

/// Ties the feed, the pump controller, the charts and the screen together.
///
/// Each `on_*` method handles one delivery from one subscription and runs to completion;
/// the caller makes sure only one runs at a time.
pub struct Dashboard<F, V, R, C>
where
    F: RealtimeFeed + Clone,
    V: DashboardView,
    R: ChartRenderer,
    C: Clock,
{
    feed: F,
    paths: FeedPaths,
    format: TimeFormat,
    controller: FeedController<F>,
    buffer: SlidingChartBuffer,
    charts: Option<ChartSet<R>>,
    make_chart: fn(Metric) -> R,
    view: V,
    clock: C,
    shown_logs: usize,
}

impl<F, V, R, C> Dashboard<F, V, R, C>
where
    F: RealtimeFeed + Clone,
    V: DashboardView,
    R: ChartRenderer,
    C: Clock,
{
    pub fn new(feed: F, settings: DashboardSettings, view: V, clock: C, make_chart: fn(Metric) -> R) -> Self {
        let controller = PumpHysteresisController::new(
            settings.policy,
            FeedPump::new(feed.clone(), settings.paths.pump.clone()),
            FeedEventLog::new(feed.clone(), settings.paths.logs.clone()),
        );

        Self {
            feed,
            paths: settings.paths,
            format: settings.format,
            controller,
            buffer: SlidingChartBuffer::new(settings.chart_capacity),
            charts: None,
            make_chart,
            view,
            clock,
            shown_logs: 0,
        }
    }

    /// Newest reading: update the cards, extend the charts and let the controller decide.
    /// Returns the controller's decision, `None` when the snapshot held no reading.
    pub fn on_latest(&mut self, snapshot: &Snapshot) -> Option<Decision> {
        let Some(record) = snapshot.child_values().into_iter().next() else {
            warn!("Node '{}' is empty", self.paths.monitoring);
            return None;
        };
        let reading = Reading::from_value(record);
        let now = self.clock.now();

        self.view.show_sensors(&SensorPanel::from_reading(&reading));

        // Points arriving before the history has built the charts are dropped
        if let Some(charts) = self.charts.as_mut() {
            self.buffer.append(
                self.format.chart_label(now),
                reading.temperature,
                reading.ph,
                reading.ppm.unwrap_or(0) as f64,
            );
            charts.refresh(&self.buffer);
        }

        self.view.set_connection(&format!(
            "Connected | Last update: {}",
            self.format.status_stamp(&reading.timestamp)
        ));
        debug!("Latest reading loaded: {:?}", reading.timestamp);

        let ppm = self.controller.policy().effective_ppm(reading.ppm);
        let decision = self.controller.update(ppm, now);
        self.sync_log();

        Some(decision)
    }

    /// Historical readings, delivered once at startup: seed and build the charts
    pub fn on_history(&mut self, snapshot: &Snapshot) {
        let readings: Vec<Reading> = snapshot
            .child_values()
            .into_iter()
            .map(Reading::from_value)
            .collect();

        self.buffer.bulk_load(&readings, &self.format);

        let make_chart = self.make_chart;
        let charts = self.charts.get_or_insert_with(|| ChartSet::build(make_chart));
        charts.refresh(&self.buffer);

        info!("Charts loaded with {} historical points", self.buffer.len());
    }

    pub fn on_pump_state(&mut self, snapshot: &Snapshot) {
        let command = PumpCommand::from_value(snapshot.value());
        self.view.show_pump(&PumpPanel::from_command(&command));
    }

    pub fn on_feed_error(&mut self, error: &FeedError) {
        error!("Feed subscription failed: {}", error);
        self.view.set_connection("Disconnected");
    }

    /// Manual override: read the pump state once, then flip it
    pub fn toggle_pump(&mut self) -> Result<PumpCommand, FeedError> {
        let snapshot = self.feed.once(Query::path(self.paths.pump.clone()))?;
        let current = snapshot
            .exists()
            .then(|| PumpCommand::from_value(snapshot.value()));

        let command = self.controller.manual_toggle(current.as_ref(), self.clock.now());
        self.sync_log();
        Ok(command)
    }

    /// Writes the whole monitoring history to a CSV file in `dir`
    pub fn export_csv(&mut self, dir: &Path) -> Result<PathBuf, ExportError> {
        let snapshot = self.feed.once(Query::path(self.paths.monitoring.clone()))?;
        let result = export_snapshot(&snapshot, &self.format, dir, self.clock.now());

        if let Err(ExportError::NoData) = &result {
            self.view.notify("No data to download.");
        }
        result
    }

    /// Pushes log entries recorded since the last sync to the top of the view's list
    fn sync_log(&mut self) {
        let entries = self.controller.event_log().entries();
        let fresh = entries.len().saturating_sub(self.shown_logs);
        for entry in entries.iter().take(fresh).rev() {
            self.view.prepend_log(entry);
        }
        self.shown_logs = entries.len();
    }

    pub fn paths(&self) -> &FeedPaths {
        &self.paths
    }

    pub fn chart_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn controller(&self) -> &FeedController<F> {
        &self.controller
    }

    pub fn buffer(&self) -> &SlidingChartBuffer {
        &self.buffer
    }

    pub fn charts(&self) -> Option<&ChartSet<R>> {
        self.charts.as_ref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }
}
