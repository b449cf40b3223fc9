use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use crossbeam_channel::{unbounded, Sender};
use log::*;
use serde_json::{Map, Value};
use software_defined_hydroponics::state::feed::{path_segments, FeedError, Query, Snapshot};
use software_defined_hydroponics::state::traits::{RealtimeFeed, Subscription};

use crate::feeds::push_id::PushIdGenerator;

/// Characters a path segment may not contain
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

/// Errors that can occur while seeding a feed from a JSON export
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

struct Subscriber {
    query: Query,
    segments: Vec<String>,
    sender: Sender<Result<Snapshot, FeedError>>,
    /// Last result delivered, to skip writes that do not change it
    last: Option<Value>,
}

struct FeedState {
    root: Value,
    subscribers: Vec<Subscriber>,
    denied: Vec<Vec<String>>,
    push_ids: PushIdGenerator,
}

/// In-process realtime feed: a JSON tree with live subscriptions.
///
/// Clones share the same tree. Subscribers get the current value on subscribe and a new
/// snapshot whenever a write under (or above) their path changes what their query returns.
#[derive(Clone)]
pub struct MemoryFeed {
    state: Arc<Mutex<FeedState>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::from_json(Value::Object(Map::new()))
    }

    /// Seeds the feed with a whole-tree export
    pub fn from_json(root: Value) -> Self {
        let root = if root.is_object() { root } else { Value::Object(Map::new()) };
        Self {
            state: Arc::new(Mutex::new(FeedState {
                root,
                subscribers: Vec::new(),
                denied: Vec::new(),
                push_ids: PushIdGenerator::default(),
            })),
        }
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path)?;
        let root: Value = serde_json::from_str(&content)?;
        info!("Seeded feed from {}", path.display());
        Ok(Self::from_json(root))
    }

    /// The whole tree as it is now
    pub fn to_json(&self) -> Value {
        self.lock().root.clone()
    }

    /// Refuses every read and write under `path` from now on. Live subscriptions under or
    /// above it receive the error and are dropped.
    pub fn deny(&self, path: &str) {
        let denied: Vec<String> = owned_segments(path);
        let mut state = self.lock();

        let error = FeedError::PermissionDenied(path.to_string());
        state.subscribers.retain(|sub| {
            if related(&sub.segments, &denied) {
                let _ = sub.sender.send(Err(error.clone()));
                false
            } else {
                true
            }
        });

        warn!("Access to \"{}\" revoked", path);
        state.denied.push(denied);
    }

    pub fn allow(&self, path: &str) {
        let allowed = owned_segments(path);
        self.lock().denied.retain(|d| *d != allowed);
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sends fresh snapshots to everyone watching `written`, pruning closed receivers
    fn notify(state: &mut FeedState, written: &[String]) {
        let FeedState {
            root, subscribers, ..
        } = state;

        subscribers.retain_mut(|sub| {
            if !related(&sub.segments, written) {
                return true;
            }
            let current = sub.query.apply(lookup(root, &sub.segments));
            if current == sub.last {
                return true;
            }
            sub.last = current.clone();
            sub.sender
                .send(Ok(Snapshot::new(sub.query.path.clone(), current)))
                .is_ok()
        });
    }
}

impl Default for MemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeFeed for MemoryFeed {
    fn subscribe(&self, query: Query) -> Result<Subscription, FeedError> {
        let segments = checked_segments(&query.path)?;
        let mut state = self.lock();
        check_access(&state, &segments, &query.path)?;

        let (sender, receiver) = unbounded();
        let current = query.apply(lookup(&state.root, &segments));
        let _ = sender.send(Ok(Snapshot::new(query.path.clone(), current.clone())));

        debug!("Subscribed to \"{}\" (limit {:?})", query.path, query.limit_to_last);
        state.subscribers.push(Subscriber {
            query,
            segments,
            sender,
            last: current,
        });

        Ok(receiver)
    }

    fn once(&self, query: Query) -> Result<Snapshot, FeedError> {
        let segments = checked_segments(&query.path)?;
        let state = self.lock();
        check_access(&state, &segments, &query.path)?;

        let value = query.apply(lookup(&state.root, &segments));
        Ok(Snapshot::new(query.path, value))
    }

    fn set(&self, path: &str, value: Value) -> Result<(), FeedError> {
        let segments = checked_segments(path)?;
        let mut state = self.lock();
        check_access(&state, &segments, path)?;

        store(&mut state.root, &segments, value);
        Self::notify(&mut state, &segments);
        Ok(())
    }

    fn push(&self, path: &str, value: Value) -> Result<String, FeedError> {
        let segments = checked_segments(path)?;
        let mut state = self.lock();
        check_access(&state, &segments, path)?;

        match lookup(&state.root, &segments) {
            None | Some(Value::Object(_)) => {}
            Some(_) => return Err(FeedError::NotACollection(path.to_string())),
        }

        let key = state.push_ids.next_id(Utc::now().timestamp_millis());
        let mut child = segments.clone();
        child.push(key.clone());

        store(&mut state.root, &child, value);
        Self::notify(&mut state, &child);
        Ok(key)
    }
}

fn owned_segments(path: &str) -> Vec<String> {
    path_segments(path).into_iter().map(str::to_string).collect()
}

fn checked_segments(path: &str) -> Result<Vec<String>, FeedError> {
    let segments = owned_segments(path);
    if segments.iter().any(|s| s.contains(FORBIDDEN)) {
        return Err(FeedError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn check_access(state: &FeedState, segments: &[String], path: &str) -> Result<(), FeedError> {
    if state.denied.iter().any(|d| segments.starts_with(d)) {
        return Err(FeedError::PermissionDenied(path.to_string()));
    }
    Ok(())
}

/// One path contains the other
fn related(a: &[String], b: &[String]) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

fn lookup<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| node.get(segment.as_str()))
        .filter(|v| !v.is_null())
}

/// Writes `value` at `segments`, creating intermediate nodes. `Null` deletes the node
/// and any parents left empty.
fn store(root: &mut Value, segments: &[String], value: Value) {
    let Some((leaf, parents)) = segments.split_last() else {
        *root = if value.is_object() { value } else { Value::Object(Map::new()) };
        return;
    };

    if value.is_null() {
        remove(root, segments);
        return;
    }

    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => unreachable!("node was just made an object"),
        };
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(leaf.clone(), value);
    }
}

fn remove(node: &mut Value, segments: &[String]) -> bool {
    let Value::Object(map) = node else {
        return false;
    };
    match segments {
        [] => false,
        [leaf] => {
            map.remove(leaf.as_str());
            map.is_empty()
        }
        [head, rest @ ..] => {
            let emptied = match map.get_mut(head.as_str()) {
                Some(child) => remove(child, rest),
                None => false,
            };
            if emptied {
                map.remove(head.as_str());
            }
            map.is_empty()
        }
    }
}
