//! # Harness-Oxide smoke runner
//!
//! Runs a small smoke suite against the configured environment and writes a
//! JSON report.
//!
//! ## Suite
//! - **UI**: the base URL loads to `document.readyState == "complete"`
//! - **API**: `GET` on the API base URL answers 2xx (skipped when
//!   `HARNESS_API_BASE_URL` is unset)
//!
//! ## Environment variables
//! - `HARNESS_CONFIG`: TOML file loaded before the variables below
//! - `HARNESS_BROWSER`: chrome, firefox, edge or safari (default: chrome)
//! - `HARNESS_VIEWPORT`: desktop, tablet or mobile (default: desktop)
//! - `HARNESS_BASE_URL`: URL opened by UI tests
//! - `HARNESS_WEBDRIVER_URL`: WebDriver endpoint (default: http://localhost:4444)
//!
//! Exits with status 1 when any test failed.

use harness_oxide::{
    config::Config,
    driver::WebDriverBrowser,
    lifecycle::{LifecycleOrchestrator, Skip, SuiteEntry, TestCase},
    logging,
    report::{JsonReportSink, SystemInfo},
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Harness run aborted: {}", e);
            eprintln!("harness-oxide: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run() -> harness_oxide::Result<bool> {
    let config = Config::load()?;
    logging::init(&config.log_level)?;

    info!("Harness-Oxide v{}", harness_oxide::VERSION);
    info!(
        "Configuration loaded: browser={}, viewport={}, base_url={}",
        config.browser, config.viewport, config.base_url
    );

    let driver = Arc::new(WebDriverBrowser::new(&config.webdriver_url, config.headless)?);
    let sink = Arc::new(JsonReportSink::new(&config.report_dir, SystemInfo::from(&config)));
    let orchestrator = LifecycleOrchestrator::from_config(&config, driver, sink.clone())?;

    let api_configured = config.api_base_url.is_some();
    let suite = vec![
        SuiteEntry::new(
            TestCase::ui("base_url_loads").category("Smoke"),
            |scope| async move {
                scope.wait()?.page_ready(None).await?;
                let title = scope.driver()?.title().await?;
                scope.log(format!("Page title: {}", title));
                Ok(())
            },
        ),
        SuiteEntry::new(
            TestCase::api("api_base_url_responds").category("Smoke"),
            move |scope| async move {
                if !api_configured {
                    return Err(Skip::because("api_base_url is not configured").into());
                }
                let response = scope.api()?.get("").await?;
                scope.log(format!("HTTP {}", response.status));
                anyhow::ensure!(response.is_success(), "unexpected status {}", response.status);
                Ok(())
            },
        ),
    ];

    let summary = orchestrator.run_suite(suite).await?;
    orchestrator.finish().await?;

    info!(
        "{} test(s): {} passed, {} failed, {} skipped. Report: {}",
        summary.total(),
        summary.passed,
        summary.failed,
        summary.skipped,
        sink.path().display()
    );

    Ok(summary.is_success())
}
