use serde_json::Value;

/// Failures reported by a realtime feed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    /// The feed refused access to a path
    #[error("permission denied at \"{0}\"")]
    PermissionDenied(String),

    /// The path is empty or malformed
    #[error("invalid path \"{0}\"")]
    InvalidPath(String),

    /// A child was pushed under a node that holds a plain value
    #[error("\"{0}\" is not a collection")]
    NotACollection(String),

    /// The feed (or the link to it) is gone
    #[error("feed disconnected")]
    Disconnected,
}

/// Splits a `/`-separated path into its segments, ignoring empty ones
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// A read against the feed: a path, optionally narrowed to its last `n` children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub path: String,
    pub limit_to_last: Option<usize>,
}

impl Query {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            limit_to_last: None,
        }
    }

    pub fn limit_to_last(mut self, n: usize) -> Self {
        self.limit_to_last = Some(n);
        self
    }

    /// Applies the limit to the value stored at the query path.
    ///
    /// Children are ordered by key, which for pushed children is insertion order.
    pub fn apply(&self, value: Option<&Value>) -> Option<Value> {
        let value = value?;
        match (self.limit_to_last, value) {
            (Some(n), Value::Object(map)) => {
                let skip = map.len().saturating_sub(n);
                let limited: serde_json::Map<String, Value> = map
                    .iter()
                    .skip(skip)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if limited.is_empty() {
                    None
                } else {
                    Some(Value::Object(limited))
                }
            }
            _ => Some(value.clone()),
        }
    }
}

/// The value found at a path at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: String,
    pub value: Option<Value>,
}

impl Snapshot {
    pub fn new(path: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    pub fn exists(&self) -> bool {
        matches!(&self.value, Some(v) if !v.is_null())
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref().filter(|v| !v.is_null())
    }

    /// Children in key order. Plain values have no children.
    pub fn children(&self) -> Vec<(String, &Value)> {
        match self.value() {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Child values only, in key order
    pub fn child_values(&self) -> Vec<&Value> {
        self.children().into_iter().map(|(_, v)| v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("actuators/pump"), vec!["actuators", "pump"]);
        assert_eq!(path_segments("/logs/"), vec!["logs"]);
        assert!(path_segments("").is_empty());
    }

    #[test]
    fn test_limit_to_last_keeps_newest_keys() {
        let value = json!({ "a": 1, "b": 2, "c": 3 });
        let limited = Query::path("monitoring").limit_to_last(2).apply(Some(&value));
        assert_eq!(limited, Some(json!({ "b": 2, "c": 3 })));
    }

    #[test]
    fn test_limit_larger_than_collection() {
        let value = json!({ "a": 1 });
        let limited = Query::path("monitoring").limit_to_last(20).apply(Some(&value));
        assert_eq!(limited, Some(json!({ "a": 1 })));
    }

    #[test]
    fn test_snapshot_children_in_key_order() {
        let snapshot = Snapshot::new("m", Some(json!({ "b": 2, "a": 1 })));
        let keys: Vec<String> = snapshot.children().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_null_snapshot_does_not_exist() {
        assert!(!Snapshot::new("m", Some(Value::Null)).exists());
        assert!(!Snapshot::new("m", None).exists());
        assert!(Snapshot::new("m", Some(json!(0))).exists());
    }
}
