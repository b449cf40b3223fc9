pub mod feed_actuator;
pub mod memory_feed;
pub mod push_id;
