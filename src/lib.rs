#![forbid(unsafe_code)]

//! Personal task planner: a `SQLite` task store, a scheduling-context
//! engine (free slots, historical patterns, dependency blocking), and the
//! HTTP and MCP surfaces that expose them.

pub mod api;
pub mod config;
pub mod errors;
pub mod mcp;
pub mod models;
pub mod persistence;
pub mod scheduling;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
