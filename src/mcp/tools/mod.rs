//! MCP tool handlers.

pub mod analytics;
pub mod tasks;
pub mod today;
pub mod util;
