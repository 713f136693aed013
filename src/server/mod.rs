//! Server lifecycle: template → start → running handle → stop.

pub mod listener;
pub mod session;
pub mod template;

pub use template::{ServerHandle, ServerTemplate};
