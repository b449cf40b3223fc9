pub mod sensors;
pub mod time;
