//! # Session management layer
//!
//! Acquires, tracks and releases the single browser session a worker may hold.
//!
//! ## Core concepts
//! - **Session**: one live browser handle plus the wait engine bound to it
//! - **SessionRegistry**: the worker's single active-session slot
//! - **ResourceAcquirer**: creation with a bounded retry budget, viewport
//!   sizing, release
//!
//! ## Module structure
//! - `types`: browser kinds, viewport profiles, retry budget, session record
//! - `registry`: single-slot registry
//! - `acquirer`: acquisition and release
//!
//! ## Usage
//! ```rust,no_run
//! use harness_oxide::driver::MockDriver;
//! use harness_oxide::session::{BrowserKind, ResourceAcquirer, SessionRegistry, ViewportProfile};
//! use std::sync::Arc;
//!
//! # async fn example() -> harness_oxide::Result<()> {
//! let registry = Arc::new(SessionRegistry::new());
//! let acquirer = ResourceAcquirer::new(Arc::new(MockDriver::new()), registry.clone());
//!
//! let session = acquirer.acquire(BrowserKind::Chrome, ViewportProfile::Tablet, 3).await?;
//! acquirer.navigate("https://example.com").await?;
//! session.wait().page_ready(None).await?;
//!
//! acquirer.release().await;
//! assert!(!registry.is_active());
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod registry;
pub mod acquirer;


pub use types::{
    AttemptFailure, BrowserKind, RetryBudget, Session, ViewportProfile, WindowPolicy,
    DEFAULT_MAX_ATTEMPTS,
};

pub use registry::SessionRegistry;
pub use acquirer::{apply_viewport, navigate_to, Release, ResourceAcquirer};
