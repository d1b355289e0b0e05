//! Session value types
//!
//! Browser kinds, viewport profiles, the acquisition retry budget and the
//! live `Session` record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::driver::DriverHandle;
use crate::wait::WaitEngine;
use crate::{Error, Result};

/// Default acquisition retry ceiling
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Browser kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
    Edge,
    Safari,
}

impl BrowserKind {
    /// `browserName` capability understood by the matching WebDriver server
    pub fn webdriver_name(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Edge => "MicrosoftEdge",
            BrowserKind::Safari => "safari",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Edge => "edge",
            BrowserKind::Safari => "safari",
        };
        f.write_str(name)
    }
}

impl FromStr for BrowserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" | "gecko" => Ok(BrowserKind::Firefox),
            "edge" | "msedge" | "microsoftedge" => Ok(BrowserKind::Edge),
            "safari" => Ok(BrowserKind::Safari),
            other => Err(Error::configuration(format!("Unsupported browser: {}", other))),
        }
    }
}

/// How the browser window is sized after session creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    Maximize,
    Fixed { width: u32, height: u32 },
}

/// Viewport profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ViewportProfile {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl ViewportProfile {
    /// Window policy for this profile
    pub fn window_policy(&self) -> WindowPolicy {
        match self {
            ViewportProfile::Desktop => WindowPolicy::Maximize,
            ViewportProfile::Tablet => WindowPolicy::Fixed {
                width: 768,
                height: 1024,
            },
            ViewportProfile::Mobile => WindowPolicy::Fixed {
                width: 375,
                height: 667,
            },
        }
    }

    /// Parse a profile name; unrecognized names fall back to `Desktop` (maximize)
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "desktop" => ViewportProfile::Desktop,
            "tablet" => ViewportProfile::Tablet,
            "mobile" => ViewportProfile::Mobile,
            other => {
                tracing::warn!("Unrecognized viewport profile '{}', maximizing window", other);
                ViewportProfile::Desktop
            }
        }
    }
}

impl From<String> for ViewportProfile {
    fn from(name: String) -> Self {
        Self::parse_lenient(&name)
    }
}

impl fmt::Display for ViewportProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewportProfile::Desktop => "desktop",
            ViewportProfile::Tablet => "tablet",
            ViewportProfile::Mobile => "mobile",
        };
        f.write_str(name)
    }
}

/// One failed acquisition attempt
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    /// 1-based attempt index
    pub attempt: u32,
    /// Underlying failure
    pub cause: String,
}

/// Bounded attempt counter for session acquisition
///
/// Consumed monotonically; a fresh budget is built for every acquisition.
#[derive(Debug)]
pub struct RetryBudget {
    max_attempts: u32,
    attempt: u32,
    failures: Vec<AttemptFailure>,
}

impl RetryBudget {
    /// Create a budget of `max_attempts` attempts
    pub fn new(max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::configuration("max_attempts must be at least 1"));
        }
        Ok(Self {
            max_attempts,
            attempt: 0,
            failures: Vec::new(),
        })
    }

    /// Start the next attempt, returning its 1-based index, or `None` when exhausted
    pub fn next_attempt(&mut self) -> Option<u32> {
        if self.is_exhausted() {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    /// Record the failure of the current attempt
    pub fn record_failure<E: fmt::Display>(&mut self, cause: &E) {
        self.failures.push(AttemptFailure {
            attempt: self.attempt,
            cause: cause.to_string(),
        });
    }

    /// Attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Failures in attempt order
    pub fn failures(&self) -> &[AttemptFailure] {
        &self.failures
    }

    /// Convert an exhausted budget into the acquisition error
    pub fn into_error(self, kind: BrowserKind) -> Error {
        let last_cause = self
            .failures
            .last()
            .map(|f| f.cause.clone())
            .unwrap_or_else(|| "no attempt was made".to_string());
        Error::Acquisition {
            kind,
            attempts: self.attempt,
            last_cause,
        }
    }
}

/// A live browser session
#[derive(Debug)]
pub struct Session {
    id: String,
    kind: BrowserKind,
    viewport: ViewportProfile,
    handle: Arc<dyn DriverHandle>,
    wait: WaitEngine,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session record around a driver handle
    pub fn new(
        kind: BrowserKind,
        viewport: ViewportProfile,
        handle: Arc<dyn DriverHandle>,
        wait: WaitEngine,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            viewport,
            handle,
            wait,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> BrowserKind {
        self.kind
    }

    pub fn viewport(&self) -> ViewportProfile {
        self.viewport
    }

    /// Underlying driver handle
    pub fn driver(&self) -> &Arc<dyn DriverHandle> {
        &self.handle
    }

    /// Wait engine bound to this session
    pub fn wait(&self) -> &WaitEngine {
        &self.wait
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
