//! # Browser driver layer
//!
//! The narrow capability boundary between the harness and a browser
//! automation backend: create a session, navigate, locate elements, run
//! scripts, capture screenshots, size the window and quit.
//!
//! ## Module structure
//! - `traits`: `BrowserDriver` / `DriverHandle` and the value types they exchange
//! - `webdriver`: W3C WebDriver HTTP backend
//! - `mock`: scriptable in-process backend for tests
//!
//! ## Usage
//! ```rust,no_run
//! use harness_oxide::driver::{BrowserDriver, WebDriverBrowser};
//! use harness_oxide::session::BrowserKind;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = WebDriverBrowser::new("http://localhost:4444", true)?;
//! let session = driver.create_session(BrowserKind::Chrome).await?;
//! session.navigate("https://example.com").await?;
//! session.quit().await?;
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod webdriver;
pub mod mock;


pub use traits::{BrowserDriver, DriverHandle, ElementHandle, Locator, WindowRect};

pub use webdriver::{WebDriverBrowser, WebDriverSession};

pub use mock::{ElementScript, MockDriver, MockSession};
