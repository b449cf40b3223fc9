use std::time::Duration;

use feed_abstraction::MemoryFeed;
use log::*;
use rumqttc::{Client, Connection, MqttOptions, QoS};
use serde_json::Value;
use software_defined_hydroponics::state::feed::{FeedError, Query, Snapshot};
use software_defined_hydroponics::state::traits::{RealtimeFeed, Subscription};

use crate::config::config::{FeedPaths, MqttConfig};

/// Requests queued between the client handle and the connection loop
const REQUEST_CAPACITY: usize = 32;

pub fn mqtt_create(config: &MqttConfig) -> (Client, Connection) {
    let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_s.max(5)));
    options.set_clean_session(true);
    if let Some(username) = &config.username {
        options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
    }

    Client::new(options, REQUEST_CAPACITY)
}

/// Broker topics mirroring the feed paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub monitoring: String,
    pub pump: String,
    pub logs: String,
    pub commands: String,
    pub responses: String,
    paths: FeedPaths,
}

impl Topics {
    pub fn new(prefix: &str, paths: &FeedPaths) -> Self {
        let topic = |path: &str| format!("{}/{}", prefix.trim_end_matches('/'), path.trim_matches('/'));
        Self {
            monitoring: topic(&paths.monitoring),
            pump: topic(&paths.pump),
            logs: topic(&paths.logs),
            commands: topic("commands"),
            responses: topic("responses"),
            paths: paths.clone(),
        }
    }

    /// Topics this service listens on
    pub fn inbound(&self) -> [&str; 3] {
        [&self.monitoring, &self.pump, &self.commands]
    }

    /// The topic a write to `path` is published on, if it is mirrored at all
    pub fn for_path(&self, path: &str) -> Option<&str> {
        let path = path.trim_matches('/');
        if path == self.paths.pump.trim_matches('/') {
            Some(&self.pump)
        } else if path == self.paths.logs.trim_matches('/') {
            Some(&self.logs)
        } else {
            None
        }
    }

    pub fn paths(&self) -> &FeedPaths {
        &self.paths
    }
}

/// The local feed with writes mirrored to the broker.
///
/// Reads and subscriptions are served locally. The pump document is published retained so
/// late joiners see the current state; log entries are published as they are appended.
/// Publishing never waits on the connection: when the request queue is full the publish
/// is dropped and logged, and the local write stands.
#[derive(Clone)]
pub struct BridgedFeed {
    local: MemoryFeed,
    client: Client,
    topics: Topics,
}

impl BridgedFeed {
    pub fn new(local: MemoryFeed, client: Client, topics: Topics) -> Self {
        Self {
            local,
            client,
            topics,
        }
    }

    fn publish(&self, path: &str, value: &Value) {
        let Some(topic) = self.topics.for_path(path) else {
            return;
        };
        let retain = topic == self.topics.pump;
        if let Err(e) = self.client.try_publish(
            topic,
            QoS::AtLeastOnce,
            retain,
            value.to_string().into_bytes(),
        ) {
            error!("Failed to publish to {}: {}", topic, e);
        }
    }
}

impl RealtimeFeed for BridgedFeed {
    fn subscribe(&self, query: Query) -> Result<Subscription, FeedError> {
        self.local.subscribe(query)
    }

    fn once(&self, query: Query) -> Result<Snapshot, FeedError> {
        self.local.once(query)
    }

    fn set(&self, path: &str, value: Value) -> Result<(), FeedError> {
        self.local.set(path, value.clone())?;
        self.publish(path, &value);
        Ok(())
    }

    fn push(&self, path: &str, value: Value) -> Result<String, FeedError> {
        let key = self.local.push(path, value.clone())?;
        self.publish(path, &value);
        Ok(key)
    }
}
