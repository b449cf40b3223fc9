pub mod mqtt;

pub use mqtt::{mqtt_create, BridgedFeed, Topics};
