//! Harness-Oxide: test execution lifecycle orchestration
//!
//! This library runs UI, API and database tests through a fixed lifecycle:
//! browser sessions are acquired with a bounded retry budget, bodies run
//! against explicit waits, and teardown captures a screenshot, records the
//! outcome and releases the session on every exit path.

pub mod error;
pub mod config;
pub mod logging;

pub mod driver;
pub mod session;
pub mod wait;
pub mod artifacts;
pub mod report;
pub mod storage;
pub mod api;
pub mod lifecycle;

// Re-exports
pub use error::{Error, Result};

/// Harness-Oxide library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
