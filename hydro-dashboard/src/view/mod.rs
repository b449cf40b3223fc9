pub mod view;

pub use view::{ConsoleChart, ConsoleView, DashboardView, PumpPanel, SensorPanel};
