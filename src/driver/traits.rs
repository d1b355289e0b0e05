//! Browser driver layer traits
//!
//! This module defines the narrow capability set the harness needs from a
//! browser automation backend.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::session::BrowserKind;

/// Element locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Element `id` attribute
    Id(String),
    /// CSS class name
    ClassName(String),
    /// Element `name` attribute
    Name(String),
    /// CSS selector
    Css(String),
    /// XPath expression
    XPath(String),
    /// Exact anchor text
    LinkText(String),
}

impl Locator {
    pub fn id<S: Into<String>>(value: S) -> Self {
        Locator::Id(value.into())
    }

    pub fn class_name<S: Into<String>>(value: S) -> Self {
        Locator::ClassName(value.into())
    }

    pub fn name<S: Into<String>>(value: S) -> Self {
        Locator::Name(value.into())
    }

    pub fn css<S: Into<String>>(value: S) -> Self {
        Locator::Css(value.into())
    }

    pub fn xpath<S: Into<String>>(value: S) -> Self {
        Locator::XPath(value.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(v) => write!(f, "id={}", v),
            Locator::ClassName(v) => write!(f, "class={}", v),
            Locator::Name(v) => write!(f, "name={}", v),
            Locator::Css(v) => write!(f, "css={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
            Locator::LinkText(v) => write!(f, "link={}", v),
        }
    }
}

/// Reference to an element found in the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    /// Backend element reference
    pub id: String,
    /// Locator the element was found with
    pub locator: Locator,
}

/// Browser window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Browser driver trait
///
/// Creates live browser sessions for a requested browser kind.
#[async_trait]
pub trait BrowserDriver: Send + Sync + fmt::Debug {
    /// Start a new browser session
    async fn create_session(&self, kind: BrowserKind) -> Result<Arc<dyn DriverHandle>, crate::Error>;
}

/// Driver handle trait
///
/// One live browser automation session.
#[async_trait]
pub trait DriverHandle: Send + Sync + fmt::Debug {
    /// Backend session ID
    fn session_id(&self) -> &str;

    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<(), crate::Error>;

    /// Get the current URL
    async fn current_url(&self) -> Result<String, crate::Error>;

    /// Get the page title
    async fn title(&self) -> Result<String, crate::Error>;

    /// Find the first element matching a locator, `None` if absent
    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>, crate::Error>;

    /// Check whether an element is displayed
    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, crate::Error>;

    /// Check whether an element is enabled
    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, crate::Error>;

    /// Click an element
    async fn click(&self, element: &ElementHandle) -> Result<(), crate::Error>;

    /// Type text into an element
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), crate::Error>;

    /// Execute a synchronous script and return its value
    async fn execute_script(&self, script: &str) -> Result<Value, crate::Error>;

    /// Capture a PNG screenshot of the viewport
    async fn screenshot(&self) -> Result<Bytes, crate::Error>;

    /// Maximize the browser window
    async fn maximize_window(&self) -> Result<(), crate::Error>;

    /// Resize the browser window
    async fn set_window_size(&self, width: u32, height: u32) -> Result<(), crate::Error>;

    /// Get the browser window geometry
    async fn window_rect(&self) -> Result<WindowRect, crate::Error>;

    /// End the session and close the browser
    async fn quit(&self) -> Result<(), crate::Error>;
}
