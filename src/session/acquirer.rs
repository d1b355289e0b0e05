//! Resource acquirer
//!
//! Creates browser sessions with a bounded retry budget, sizes the window for
//! the requested viewport and installs the result in the registry. Release
//! quits the session and clears the registry slot.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::driver::{BrowserDriver, DriverHandle};
use crate::session::registry::SessionRegistry;
use crate::session::types::{BrowserKind, RetryBudget, Session, ViewportProfile, WindowPolicy};
use crate::wait::{WaitConfig, WaitEngine};
use crate::{Error, Result};

/// What a call to [`ResourceAcquirer::release`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// Nothing was active
    Idle,
    /// The session quit cleanly
    Closed(String),
    /// The slot was cleared but the browser did not quit cleanly
    QuitFailed { id: String, cause: String },
}

/// Apply a viewport profile to a freshly created session
pub async fn apply_viewport(handle: &dyn DriverHandle, viewport: ViewportProfile) -> Result<()> {
    debug!("Setting screen size to: {}", viewport);
    match viewport.window_policy() {
        WindowPolicy::Maximize => handle.maximize_window().await,
        WindowPolicy::Fixed { width, height } => handle.set_window_size(width, height).await,
    }
}

/// Navigate a session, rejecting blank URLs before touching the driver
pub async fn navigate_to(handle: &dyn DriverHandle, url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(Error::navigation("URL cannot be null or empty"));
    }

    info!("Navigating to URL: {}", url);
    handle.navigate(url).await
}

/// Resource acquirer
#[derive(Debug)]
pub struct ResourceAcquirer {
    driver: Arc<dyn BrowserDriver>,
    registry: Arc<SessionRegistry>,
    wait_config: WaitConfig,
    retry_delay: Duration,
    // Serializes acquire and release
    lifecycle: Mutex<()>,
}

impl ResourceAcquirer {
    /// Create an acquirer over a driver and a registry
    pub fn new(driver: Arc<dyn BrowserDriver>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            driver,
            registry,
            wait_config: WaitConfig::default(),
            retry_delay: Duration::ZERO,
            lifecycle: Mutex::new(()),
        }
    }

    /// Wait configuration given to every acquired session
    pub fn with_wait_config(mut self, config: WaitConfig) -> Self {
        self.wait_config = config;
        self
    }

    /// Delay between failed creation attempts (zero retries immediately)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Acquire a session
    ///
    /// Fails fast with `DoubleAcquisition` if the registry already holds a
    /// session. Creation and viewport failures consume one attempt each; once
    /// the budget is spent the last cause is reported in `Acquisition`.
    #[instrument(skip(self), fields(browser = %kind, viewport = %viewport))]
    pub async fn acquire(
        &self,
        kind: BrowserKind,
        viewport: ViewportProfile,
        max_attempts: u32,
    ) -> Result<Arc<Session>> {
        let _lifecycle = self.lifecycle.lock().await;
        self.registry.ensure_vacant()?;

        let mut budget = RetryBudget::new(max_attempts)?;

        while let Some(attempt) = budget.next_attempt() {
            info!(
                "Initializing {} session. Attempt {}/{}",
                kind,
                attempt,
                budget.max_attempts()
            );

            match self.open(kind, viewport).await {
                Ok(handle) => {
                    let wait = WaitEngine::new(handle.clone(), self.wait_config);
                    let session = Arc::new(Session::new(kind, viewport, handle.clone(), wait));

                    if let Err(e) = self.registry.install(session.clone()) {
                        if let Err(quit_err) = handle.quit().await {
                            warn!("Failed to quit orphaned session: {}", quit_err);
                        }
                        return Err(e);
                    }

                    info!("Session {} initialized successfully", session.id());
                    return Ok(session);
                }
                Err(e) => {
                    warn!("Error initializing {} session (attempt {}): {}", kind, attempt, e);
                    budget.record_failure(&e);

                    if !budget.is_exhausted() && !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        let err = budget.into_error(kind);
        error!("{}", err);
        Err(err)
    }

    /// Create one driver session and size its window
    async fn open(&self, kind: BrowserKind, viewport: ViewportProfile) -> Result<Arc<dyn DriverHandle>> {
        let handle = self.driver.create_session(kind).await?;

        if let Err(e) = apply_viewport(handle.as_ref(), viewport).await {
            if let Err(quit_err) = handle.quit().await {
                warn!("Failed to quit session after viewport error: {}", quit_err);
            }
            return Err(e);
        }

        Ok(handle)
    }

    /// Release the active session
    ///
    /// No-op when the registry is empty. Quit failures are logged and
    /// swallowed; the slot is cleared either way.
    pub async fn release(&self) -> Release {
        let _lifecycle = self.lifecycle.lock().await;

        let Some(session) = self.registry.take() else {
            debug!("No active session to release");
            return Release::Idle;
        };

        info!("Cleaning up session {}", session.id());
        match session.driver().quit().await {
            Ok(()) => {
                info!("Session {} cleanup completed", session.id());
                Release::Closed(session.id().to_string())
            }
            Err(e) => {
                warn!("Error during session cleanup: {}", e);
                Release::QuitFailed {
                    id: session.id().to_string(),
                    cause: e.to_string(),
                }
            }
        }
    }

    /// Navigate the active session
    pub async fn navigate(&self, url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(Error::navigation("URL cannot be null or empty"));
        }

        let session = self.registry.current()?;
        navigate_to(session.driver().as_ref(), url).await
    }
}
