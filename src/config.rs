//! Configuration management for Harness-Oxide

use crate::session::{BrowserKind, ViewportProfile, DEFAULT_MAX_ATTEMPTS};
use crate::wait::WaitConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Harness configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Browser to acquire for UI tests
    pub browser: BrowserKind,

    /// Window profile applied after acquisition
    pub viewport: ViewportProfile,

    /// URL opened at the start of every UI test
    pub base_url: String,

    /// Session creation attempts per test
    pub max_attempts: u32,

    /// Default wait timeout in seconds
    pub default_timeout_secs: u64,

    /// Wait polling interval in milliseconds
    pub poll_interval_ms: u64,

    /// Delay between failed creation attempts in milliseconds
    pub retry_delay_ms: u64,

    /// WebDriver server endpoint
    pub webdriver_url: String,

    /// Run browsers without a visible window
    pub headless: bool,

    /// Screenshot directory
    pub screenshot_dir: PathBuf,

    /// Report directory
    pub report_dir: PathBuf,

    /// Base URL for API tests
    pub api_base_url: Option<String>,

    /// JSON array file seeding every database test
    pub storage_seed: Option<PathBuf>,

    /// Environment name recorded in reports
    pub environment: String,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            viewport: ViewportProfile::Desktop,
            base_url: "https://www.saucedemo.com/".to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            default_timeout_secs: 30,
            poll_interval_ms: 250,
            retry_delay_ms: 0,
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
            screenshot_dir: PathBuf::from("Screenshots"),
            report_dir: PathBuf::from("Reports"),
            api_base_url: None,
            storage_seed: None,
            environment: "Live".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Config::default().with_overrides(|key| env::var(key).ok())
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// File named by `HARNESS_CONFIG` (if any), then environment overrides
    pub fn load() -> Result<Self> {
        let base = match env::var("HARNESS_CONFIG") {
            Ok(path) => Config::from_file(&path)?,
            Err(_) => Config::default(),
        };

        let config = base.with_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HARNESS_*` overrides read through `var`
    pub fn with_overrides<F>(mut self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(browser) = var("HARNESS_BROWSER") {
            self.browser = browser.parse()?;
        }

        if let Some(viewport) = var("HARNESS_VIEWPORT") {
            self.viewport = ViewportProfile::parse_lenient(&viewport);
        }

        if let Some(base_url) = var("HARNESS_BASE_URL") {
            self.base_url = base_url;
        }

        if let Some(attempts) = var("HARNESS_MAX_ATTEMPTS") {
            self.max_attempts = attempts
                .parse()
                .map_err(|_| Error::configuration("Invalid HARNESS_MAX_ATTEMPTS"))?;
        }

        if let Some(timeout) = var("HARNESS_DEFAULT_TIMEOUT") {
            self.default_timeout_secs = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid HARNESS_DEFAULT_TIMEOUT"))?;
        }

        if let Some(interval) = var("HARNESS_POLL_INTERVAL_MS") {
            self.poll_interval_ms = interval
                .parse()
                .map_err(|_| Error::configuration("Invalid HARNESS_POLL_INTERVAL_MS"))?;
        }

        if let Some(delay) = var("HARNESS_RETRY_DELAY_MS") {
            self.retry_delay_ms = delay
                .parse()
                .map_err(|_| Error::configuration("Invalid HARNESS_RETRY_DELAY_MS"))?;
        }

        if let Some(url) = var("HARNESS_WEBDRIVER_URL") {
            self.webdriver_url = url;
        }

        if let Some(headless) = var("HARNESS_HEADLESS") {
            self.headless = headless
                .parse()
                .map_err(|_| Error::configuration("Invalid HARNESS_HEADLESS"))?;
        }

        if let Some(dir) = var("HARNESS_SCREENSHOT_DIR") {
            self.screenshot_dir = PathBuf::from(dir);
        }

        if let Some(dir) = var("HARNESS_REPORT_DIR") {
            self.report_dir = PathBuf::from(dir);
        }

        if let Some(url) = var("HARNESS_API_BASE_URL") {
            self.api_base_url = Some(url);
        }

        if let Some(seed) = var("HARNESS_STORAGE_SEED") {
            self.storage_seed = Some(PathBuf::from(seed));
        }

        if let Some(environment) = var("HARNESS_ENVIRONMENT") {
            self.environment = environment;
        }

        if let Some(log_level) = var("HARNESS_LOG_LEVEL") {
            self.log_level = log_level;
        }

        Ok(self)
    }

    /// Reject values the harness cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::configuration("max_attempts must be at least 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::configuration("poll_interval_ms must be greater than 0"));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::configuration("base_url cannot be empty"));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Wait timing for every acquired session
    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig::new(self.default_timeout(), self.poll_interval())
    }
}
