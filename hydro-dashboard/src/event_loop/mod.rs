pub mod event_loop;
pub mod handlers;

pub use event_loop::{create_event_loop, Dispatcher};
pub use handlers::{handle_command, handle_message, DashboardCommand};
