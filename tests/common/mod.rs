//! Common test utilities
//!
//! This module provides shared test helpers and fixtures for all integration tests.

#![allow(dead_code)]

use harness_oxide::artifacts::ArtifactStore;
use harness_oxide::config::Config;
use harness_oxide::driver::MockDriver;
use harness_oxide::lifecycle::{LifecycleOrchestrator, RunSettings};
use harness_oxide::report::MemoryReportSink;
use std::path::Path;
use std::sync::Arc;

pub const BASE_URL: &str = "https://www.saucedemo.com/";

/// Configuration pointing every output directory into `dir`
pub fn test_config(dir: &Path, webdriver_url: &str) -> Config {
    Config {
        webdriver_url: webdriver_url.to_string(),
        screenshot_dir: dir.join("Screenshots"),
        report_dir: dir.join("Reports"),
        poll_interval_ms: 10,
        default_timeout_secs: 2,
        ..Config::default()
    }
}

/// Orchestrator over a mock driver and an in-memory sink
pub fn mock_orchestrator(
    driver: MockDriver,
    sink: MemoryReportSink,
    screenshots: &Path,
) -> (Arc<MockDriver>, Arc<MemoryReportSink>, LifecycleOrchestrator) {
    let driver = Arc::new(driver);
    let sink = Arc::new(sink);
    let settings = RunSettings {
        base_url: BASE_URL.to_string(),
        ..RunSettings::default()
    };

    let orchestrator = LifecycleOrchestrator::new(driver.clone(), sink.clone(), settings)
        .with_artifacts(ArtifactStore::new(screenshots));

    (driver, sink, orchestrator)
}

/// Number of files in a directory, zero if it does not exist
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
