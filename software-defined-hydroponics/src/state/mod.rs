pub mod actuators;
pub mod feed;
pub mod logs;
pub mod policy;
pub mod pump;
pub mod sensors;
pub mod traits;
