//! Headless monitoring dashboard for a hydroponic rig.
//!
//! Readings arrive over MQTT into a local realtime feed; the dashboard projects them onto
//! a view, keeps the rolling charts and drives the nutrient pump through the hysteresis
//! controller of `software-defined-hydroponics`.

pub mod config;
pub mod dashboard;
pub mod event_loop;
pub mod mqtt;
pub mod view;
