//! Mock driver implementation for testing
//!
//! Scriptable in-process browser driver: creation failures, element states
//! that change after a number of polls, readyState sequences and
//! screenshot/quit fault injection.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::traits::*;
use crate::session::BrowserKind;
use crate::Error;

/// Window size reported after maximize
pub const MOCK_SCREEN_WIDTH: u32 = 1920;
pub const MOCK_SCREEN_HEIGHT: u32 = 1080;

/// Minimal 1x1 PNG image
const MOCK_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
    0x49, 0x48, 0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE,
];

/// Scripted behaviour of one element
#[derive(Debug, Clone)]
pub struct ElementScript {
    /// Lookups that miss before the element appears; `None` means never
    pub present_after: Option<u32>,
    /// Whether the element is displayed once present
    pub displayed: bool,
    /// Enabled checks that report `false` first; `None` means never enabled
    pub enabled_after: Option<u32>,
    /// Displayed checks that fail with a stale reference first
    pub stale_checks: u32,
}

impl ElementScript {
    /// Present, displayed and enabled immediately
    pub fn ready() -> Self {
        Self {
            present_after: Some(0),
            displayed: true,
            enabled_after: Some(0),
            stale_checks: 0,
        }
    }

    /// Never present
    pub fn absent() -> Self {
        Self {
            present_after: None,
            displayed: false,
            enabled_after: None,
            stale_checks: 0,
        }
    }

    /// Present and displayed but never enabled
    pub fn disabled() -> Self {
        Self {
            present_after: Some(0),
            displayed: true,
            enabled_after: None,
            stale_checks: 0,
        }
    }

    /// Appears after `lookups` misses
    pub fn appearing_after(lookups: u32) -> Self {
        Self {
            present_after: Some(lookups),
            ..Self::ready()
        }
    }

    /// Ready, but detached from the document for the first `checks` displayed checks
    pub fn going_stale(checks: u32) -> Self {
        Self {
            stale_checks: checks,
            ..Self::ready()
        }
    }
}

#[derive(Debug, Default)]
struct ElementCounters {
    lookups: u32,
    displayed_checks: u32,
    enabled_checks: u32,
}

/// State shared between the driver and every session it created
#[derive(Debug, Default)]
struct MockState {
    elements: Mutex<HashMap<Locator, ElementScript>>,
    counters: Mutex<HashMap<Locator, ElementCounters>>,
    ready_states: Mutex<VecDeque<String>>,
    fail_screenshot: AtomicBool,
    fail_quit: AtomicBool,
    fail_navigation: AtomicBool,
    viewport_failures: AtomicU32,
    find_calls: AtomicU32,
    script_calls: AtomicU32,
}

/// Mock browser driver
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
    creation_failures: AtomicU32,
    create_calls: AtomicU32,
    sessions: Mutex<Vec<Arc<MockSession>>>,
}

impl MockDriver {
    /// Create a new mock driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` session creations
    pub fn fail_creations(self, n: u32) -> Self {
        self.creation_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` window sizing calls
    pub fn fail_viewport(self, n: u32) -> Self {
        self.state.viewport_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Script an element
    pub fn with_element(self, locator: Locator, script: ElementScript) -> Self {
        if let Ok(mut elements) = self.state.elements.lock() {
            elements.insert(locator, script);
        }
        self
    }

    /// Script the `document.readyState` sequence; the last value repeats
    pub fn with_ready_states<I, S>(self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut ready) = self.state.ready_states.lock() {
            *ready = states.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Make every screenshot fail
    pub fn fail_screenshots(self) -> Self {
        self.state.fail_screenshot.store(true, Ordering::SeqCst);
        self
    }

    /// Make every quit fail
    pub fn fail_quit(self) -> Self {
        self.state.fail_quit.store(true, Ordering::SeqCst);
        self
    }

    /// Make every navigation fail
    pub fn fail_navigation(self) -> Self {
        self.state.fail_navigation.store(true, Ordering::SeqCst);
        self
    }

    /// Number of `create_session` calls so far
    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of element lookups across all sessions
    pub fn find_calls(&self) -> u32 {
        self.state.find_calls.load(Ordering::SeqCst)
    }

    /// Number of script executions across all sessions
    pub fn script_calls(&self) -> u32 {
        self.state.script_calls.load(Ordering::SeqCst)
    }

    /// Every session created so far
    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// The most recently created session
    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.sessions().last().cloned()
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn create_session(&self, kind: BrowserKind) -> Result<Arc<dyn DriverHandle>, Error> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let remaining = self.creation_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.creation_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::driver(format!(
                "mock {} driver unavailable (call {})",
                kind, call
            )));
        }

        let session = Arc::new(MockSession::new(kind, self.state.clone()));
        self.sessions
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .push(session.clone());
        tracing::debug!("Mock: created {} session {}", kind, session.id);
        Ok(session as Arc<dyn DriverHandle>)
    }
}

/// Mock browser session
#[derive(Debug)]
pub struct MockSession {
    id: String,
    kind: BrowserKind,
    state: Arc<MockState>,
    url: Mutex<Option<String>>,
    window: Mutex<WindowRect>,
    maximized: AtomicBool,
    quit_calls: AtomicU32,
    screenshot_calls: AtomicU32,
    closed: AtomicBool,
}

impl MockSession {
    fn new(kind: BrowserKind, state: Arc<MockState>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            state,
            url: Mutex::new(None),
            window: Mutex::new(WindowRect {
                x: 0,
                y: 0,
                width: 800,
                height: 600,
            }),
            maximized: AtomicBool::new(false),
            quit_calls: AtomicU32::new(0),
            screenshot_calls: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> BrowserKind {
        self.kind
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized.load(Ordering::SeqCst)
    }

    pub fn window(&self) -> WindowRect {
        self.window.lock().map(|w| *w).unwrap_or(WindowRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        })
    }

    pub fn url(&self) -> Option<String> {
        self.url.lock().ok().and_then(|u| u.clone())
    }

    pub fn quit_calls(&self) -> u32 {
        self.quit_calls.load(Ordering::SeqCst)
    }

    pub fn screenshot_calls(&self) -> u32 {
        self.screenshot_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.is_closed() {
            return Err(Error::driver(format!("Session {} is closed", self.id)));
        }
        Ok(())
    }

    fn take_viewport_failure(&self) -> Result<(), Error> {
        let remaining = self.state.viewport_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state.viewport_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::driver("mock window manager rejected resize"));
        }
        Ok(())
    }

    fn script_for(&self, locator: &Locator) -> Result<Option<ElementScript>, Error> {
        Ok(self
            .state
            .elements
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .get(locator)
            .cloned())
    }
}

#[async_trait]
impl DriverHandle for MockSession {
    fn session_id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str) -> Result<(), Error> {
        self.ensure_open()?;
        if self.state.fail_navigation.load(Ordering::SeqCst) {
            return Err(Error::navigation(format!("mock network unreachable: {}", url)));
        }
        if let Ok(mut current) = self.url.lock() {
            *current = Some(url.to_string());
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, Error> {
        self.ensure_open()?;
        Ok(self.url().unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn title(&self) -> Result<String, Error> {
        self.ensure_open()?;
        Ok("Mock Page".to_string())
    }

    async fn find_element(&self, locator: &Locator) -> Result<Option<ElementHandle>, Error> {
        self.ensure_open()?;
        self.state.find_calls.fetch_add(1, Ordering::SeqCst);

        let Some(script) = self.script_for(locator)? else {
            return Ok(None);
        };

        let lookups = {
            let mut counters = self
                .state
                .counters
                .lock()
                .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
            let entry = counters.entry(locator.clone()).or_default();
            let seen = entry.lookups;
            entry.lookups += 1;
            seen
        };

        match script.present_after {
            Some(after) if lookups >= after => Ok(Some(ElementHandle {
                id: format!("mock-{}", locator),
                locator: locator.clone(),
            })),
            _ => Ok(None),
        }
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, Error> {
        self.ensure_open()?;
        let Some(script) = self.script_for(&element.locator)? else {
            return Ok(false);
        };

        let checks = {
            let mut counters = self
                .state
                .counters
                .lock()
                .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
            let entry = counters.entry(element.locator.clone()).or_default();
            let seen = entry.displayed_checks;
            entry.displayed_checks += 1;
            seen
        };

        if checks < script.stale_checks {
            return Err(Error::stale_element(format!(
                "{} is not attached to the page document",
                element.locator
            )));
        }
        Ok(script.displayed)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, Error> {
        self.ensure_open()?;
        let Some(script) = self.script_for(&element.locator)? else {
            return Ok(false);
        };

        let checks = {
            let mut counters = self
                .state
                .counters
                .lock()
                .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
            let entry = counters.entry(element.locator.clone()).or_default();
            let seen = entry.enabled_checks;
            entry.enabled_checks += 1;
            seen
        };

        Ok(matches!(script.enabled_after, Some(after) if checks >= after))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), Error> {
        self.ensure_open()?;
        tracing::debug!("Mock: click {}", element.locator);
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), Error> {
        self.ensure_open()?;
        tracing::debug!("Mock: type {} chars into {}", text.len(), element.locator);
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<Value, Error> {
        self.ensure_open()?;
        self.state.script_calls.fetch_add(1, Ordering::SeqCst);

        if script.contains("document.readyState") {
            let mut states = self
                .state
                .ready_states
                .lock()
                .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
            let state = if states.len() > 1 {
                states.pop_front()
            } else {
                states.front().cloned()
            };
            return Ok(Value::String(state.unwrap_or_else(|| "complete".to_string())));
        }

        Ok(Value::Null)
    }

    async fn screenshot(&self) -> Result<Bytes, Error> {
        self.ensure_open()?;
        self.screenshot_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_screenshot.load(Ordering::SeqCst) {
            return Err(Error::screenshot("mock compositor crashed"));
        }
        Ok(Bytes::from_static(MOCK_PNG))
    }

    async fn maximize_window(&self) -> Result<(), Error> {
        self.ensure_open()?;
        self.take_viewport_failure()?;
        if let Ok(mut window) = self.window.lock() {
            *window = WindowRect {
                x: 0,
                y: 0,
                width: MOCK_SCREEN_WIDTH,
                height: MOCK_SCREEN_HEIGHT,
            };
        }
        self.maximized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn set_window_size(&self, width: u32, height: u32) -> Result<(), Error> {
        self.ensure_open()?;
        self.take_viewport_failure()?;
        if let Ok(mut window) = self.window.lock() {
            window.width = width;
            window.height = height;
        }
        self.maximized.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn window_rect(&self) -> Result<WindowRect, Error> {
        self.ensure_open()?;
        Ok(self.window())
    }

    async fn quit(&self) -> Result<(), Error> {
        self.quit_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_quit.load(Ordering::SeqCst) {
            return Err(Error::driver("mock browser process did not exit"));
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
