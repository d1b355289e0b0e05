//! # Wait engine
//!
//! Explicit waits: a condition is evaluated against the current session at a
//! fixed interval until it produces a value or its deadline passes. Timeouts
//! are typed by what was awaited (visibility, clickability, page load) so
//! callers can react differently to each.
//!
//! ## Usage
//! ```rust,no_run
//! use harness_oxide::driver::Locator;
//! use harness_oxide::session::Session;
//! use std::time::Duration;
//!
//! # async fn example(session: &Session) -> harness_oxide::Result<()> {
//! session.wait().page_ready(None).await?;
//! let button = session
//!     .wait()
//!     .element_clickable(&Locator::id("login-button"), Some(Duration::from_secs(5)))
//!     .await?;
//! session.driver().click(&button).await?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod conditions;


pub use engine::{
    WaitCondition, WaitConfig, WaitEngine, WaitKind, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT,
};
pub use conditions::{element_clickable, element_visible, page_ready};
