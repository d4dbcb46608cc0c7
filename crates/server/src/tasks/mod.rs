//! Background tasks that run beside the HTTP server.

pub mod user_count;

pub use user_count::spawn_user_count_logger;
