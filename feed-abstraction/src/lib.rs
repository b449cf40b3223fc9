//! Realtime feed and actuator implementations for `software-defined-hydroponics`.

pub mod feeds;

pub use feeds::feed_actuator::{FeedEventLog, FeedPump, LOGS_PATH, PUMP_PATH};
pub use feeds::memory_feed::{LoadError, MemoryFeed};
