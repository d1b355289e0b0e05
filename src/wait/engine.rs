//! Condition polling engine

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::driver::{DriverHandle, ElementHandle, Locator};
use crate::{Error, Result};

/// Default wait ceiling
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What a wait was waiting for; carried by timeout errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WaitKind {
    /// Element never appeared
    Visibility,
    /// Element present but never interactable
    Clickability,
    /// Page never finished loading
    PageLoad,
}

impl fmt::Display for WaitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitKind::Visibility => "visibility",
            WaitKind::Clickability => "clickability",
            WaitKind::PageLoad => "page load",
        };
        f.write_str(name)
    }
}

/// Timing of a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Maximum time to wait for the condition
    pub timeout: Duration,
    /// Sleep between two evaluations
    pub poll_interval: Duration,
}

impl WaitConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

type Check<T> = Box<dyn Fn(Arc<dyn DriverHandle>) -> BoxFuture<'static, Result<Option<T>>> + Send + Sync>;

/// A value producer polled against the session until it yields `Some`
pub struct WaitCondition<T> {
    kind: WaitKind,
    description: String,
    check: Check<T>,
}

impl<T> WaitCondition<T> {
    /// Build a condition from an async check
    ///
    /// The check returns `Ok(None)` while the condition is not yet satisfied.
    /// Errors abort the wait immediately. A check still running at the
    /// deadline is dropped and the wait times out.
    pub fn new<S, F, Fut>(kind: WaitKind, description: S, check: F) -> Self
    where
        S: Into<String>,
        F: Fn(Arc<dyn DriverHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>>> + Send + 'static,
    {
        Self {
            kind,
            description: description.into(),
            check: Box::new(move |handle| check(handle).boxed()),
        }
    }

    pub fn kind(&self) -> WaitKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<T> fmt::Debug for WaitCondition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitCondition")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .finish()
    }
}

/// Polls conditions against one session
#[derive(Debug, Clone)]
pub struct WaitEngine {
    handle: Arc<dyn DriverHandle>,
    config: WaitConfig,
}

impl WaitEngine {
    /// Bind a wait engine to a session handle
    pub fn new(handle: Arc<dyn DriverHandle>, config: WaitConfig) -> Self {
        Self { handle, config }
    }

    pub fn config(&self) -> WaitConfig {
        self.config
    }

    /// Poll `condition` until it yields a value or `timeout` elapses
    ///
    /// `None` uses the engine's default timeout. The first satisfying value is
    /// returned without further sleeping.
    pub async fn until<T>(&self, condition: &WaitCondition<T>, timeout: Option<Duration>) -> Result<T> {
        let timeout = timeout.unwrap_or(self.config.timeout);
        let started = Instant::now();
        let mut polls: u32 = 0;

        debug!("Waiting up to {:?} for {}", timeout, condition.description);

        loop {
            polls += 1;
            let remaining = timeout.saturating_sub(started.elapsed());
            let check = (condition.check)(self.handle.clone());
            let Ok(checked) = tokio::time::timeout(remaining, check).await else {
                warn!(
                    "{} wait for '{}' timed out during poll {}",
                    condition.kind, condition.description, polls
                );
                return Err(Error::wait_timeout(
                    condition.kind,
                    condition.description.clone(),
                    timeout,
                ));
            };

            if let Some(value) = checked? {
                debug!(
                    "Condition '{}' satisfied after {} poll(s) in {:?}",
                    condition.description,
                    polls,
                    started.elapsed()
                );
                return Ok(value);
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!(
                    "{} wait for '{}' timed out after {} poll(s)",
                    condition.kind, condition.description, polls
                );
                return Err(Error::wait_timeout(
                    condition.kind,
                    condition.description.clone(),
                    timeout,
                ));
            }

            tokio::time::sleep(self.config.poll_interval.min(timeout - elapsed)).await;
        }
    }

    /// Wait for an element to be present and displayed
    pub async fn element_visible(&self, locator: &Locator, timeout: Option<Duration>) -> Result<ElementHandle> {
        self.until(&super::conditions::element_visible(locator.clone()), timeout)
            .await
    }

    /// Wait for an element to be present, displayed and enabled
    pub async fn element_clickable(&self, locator: &Locator, timeout: Option<Duration>) -> Result<ElementHandle> {
        self.until(&super::conditions::element_clickable(locator.clone()), timeout)
            .await
    }

    /// Wait for `document.readyState` to report `complete`
    pub async fn page_ready(&self, timeout: Option<Duration>) -> Result<()> {
        self.until(&super::conditions::page_ready(), timeout).await
    }
}
