use std::collections::VecDeque;

use software_defined_hydroponics::state::actuators::PumpActuator;
use software_defined_hydroponics::state::feed::FeedError;
use software_defined_hydroponics::state::logs::LogEntry;
use software_defined_hydroponics::state::pump::PumpCommand;
use software_defined_hydroponics::state::traits::{EventLog, RealtimeFeed};

pub const PUMP_PATH: &str = "actuators/pump";
pub const LOGS_PATH: &str = "logs";

/// This describes the water pump in terms of the feed
///
/// `feed` is where the pump (and every other client watching it) picks up commands
///
/// `path` is the single document holding the current command, replaced whole on every write
pub struct FeedPump<F: RealtimeFeed> {
    feed: F,
    path: String,
}

impl<F: RealtimeFeed> PumpActuator for FeedPump<F> {
    fn execute(&mut self, command: PumpCommand) -> Result<(), FeedError> {
        self.feed.set(&self.path, command.to_value())
    }
}

impl<F: RealtimeFeed> FeedPump<F> {
    pub fn new(feed: F, path: impl Into<String>) -> Self {
        Self {
            feed,
            path: path.into(),
        }
    }
}

/// Appends log entries to the feed and keeps a local copy for display
///
/// `entries` is most recent first and unbounded; an entry is kept locally even when the
/// feed rejects it
pub struct FeedEventLog<F: RealtimeFeed> {
    feed: F,
    path: String,
    entries: VecDeque<LogEntry>,
}

impl<F: RealtimeFeed> EventLog for FeedEventLog<F> {
    fn record(&mut self, entry: LogEntry) -> Result<(), FeedError> {
        let result = self.feed.push(&self.path, entry.to_value()).map(|_| ());
        self.entries.push_front(entry);
        result
    }
}

impl<F: RealtimeFeed> FeedEventLog<F> {
    pub fn new(feed: F, path: impl Into<String>) -> Self {
        Self {
            feed,
            path: path.into(),
            entries: VecDeque::new(),
        }
    }

    pub fn entries(&self) -> &VecDeque<LogEntry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
