//! Control and presentation logic for a hydroponic monitoring rig: hysteresis control of
//! the nutrient pump, the rolling window behind the live charts and the CSV export of
//! monitoring history. Transports and screens plug in through the traits in [`state`] and
//! [`chart::renderer`].

pub mod chart;
pub mod controller;
pub mod export;
pub mod state;
pub mod utils;
