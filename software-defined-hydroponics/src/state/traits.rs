use crossbeam_channel::Receiver;
use serde_json::Value;

use crate::state::feed::{FeedError, Query, Snapshot};
use crate::state::logs::LogEntry;

/// Snapshots delivered by a live subscription, the current one first and then one per
/// change under the subscribed path. The feed drops the sending side when it goes away.
pub type Subscription = Receiver<Result<Snapshot, FeedError>>;

/// A tree-structured realtime store addressed by `/`-separated paths
pub trait RealtimeFeed {
    /// Streams the query result now and after every change under its path
    fn subscribe(&self, query: Query) -> Result<Subscription, FeedError>;

    /// Reads the query result exactly once
    fn once(&self, query: Query) -> Result<Snapshot, FeedError>;

    /// Replaces whatever is stored at `path`. `Value::Null` removes it.
    fn set(&self, path: &str, value: Value) -> Result<(), FeedError>;

    /// Appends a child under a new, uniquely ordered key and returns that key
    fn push(&self, path: &str, value: Value) -> Result<String, FeedError>;
}

/// Where notable events are recorded
pub trait EventLog {
    fn record(&mut self, entry: LogEntry) -> Result<(), FeedError>;
}
