//! Event Horizon models - conversation turns and projects shared by every crate.

mod message;
mod project;

pub use message::{Message, MessageRole};
pub use project::{DEFAULT_HTML_TEMPLATE, Project};

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
