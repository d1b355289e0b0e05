//! Lifecycle acceptance tests
//!
//! Whole-run scenarios through the public API with the mock driver.

mod common;

use harness_oxide::driver::{ElementScript, Locator, MockDriver};
use harness_oxide::lifecycle::{SuiteEntry, TestCase};
use harness_oxide::report::{MemoryReportSink, TestStatus};
use harness_oxide::storage::MemoryStorage;
use harness_oxide::wait::WaitKind;
use harness_oxide::Error;
use std::sync::Arc;
use std::time::Duration;

/// Scenario: three attempts, two transient failures, desktop viewport
#[tokio::test]
async fn test_flaky_grid_then_passing_login() {
    let tmp = tempfile::tempdir().unwrap();
    let user = Locator::id("user-name");
    let driver = MockDriver::new()
        .fail_creations(2)
        .with_ready_states(["loading", "complete"])
        .with_element(user.clone(), ElementScript::appearing_after(2));
    let (driver, sink, orchestrator) = common::mock_orchestrator(driver, MemoryReportSink::new(), tmp.path());

    let outcome = orchestrator
        .run(TestCase::ui("login").category("Login"), move |scope| async move {
            let wait = scope.wait()?;
            wait.page_ready(None).await?;
            let field = wait.element_visible(&user, None).await?;
            scope.driver()?.send_keys(&field, "standard_user").await?;
            Ok(())
        })
        .await
        .unwrap();

    assert!(outcome.is_passed());
    assert_eq!(driver.create_calls(), 3);

    let session = driver.last_session().unwrap();
    assert!(session.is_maximized());
    assert!(session.is_closed());
    assert_eq!(common::file_count(tmp.path()), 1);
    assert_eq!(sink.count(TestStatus::Passed), 1);
}

/// Scenario: a wait timeout inside the body fails the test with its kind
#[tokio::test]
async fn test_wait_timeout_becomes_failed_outcome() {
    let tmp = tempfile::tempdir().unwrap();
    let button = Locator::id("checkout");
    let driver = MockDriver::new().with_element(button.clone(), ElementScript::disabled());
    let (driver, sink, orchestrator) = common::mock_orchestrator(driver, MemoryReportSink::new(), tmp.path());

    let outcome = orchestrator
        .run(TestCase::ui("checkout"), move |scope| async move {
            let result = scope
                .wait()?
                .element_clickable(&button, Some(Duration::from_millis(100)))
                .await;
            if let Err(e) = &result {
                assert_eq!(e.wait_kind(), Some(WaitKind::Clickability));
            }
            result?;
            Ok(())
        })
        .await
        .unwrap();

    assert!(outcome.is_failed());
    assert!(outcome.message().unwrap().contains("clickability wait timed out"));
    assert!(outcome.artifact().is_some());
    assert_eq!(driver.last_session().unwrap().quit_calls(), 1);
    assert_eq!(sink.record("checkout").unwrap().outcome, outcome);
}

/// Scenario: sink down for a whole suite, no browser leaks
#[tokio::test]
async fn test_failing_sink_never_leaks_sessions() {
    let tmp = tempfile::tempdir().unwrap();
    let (driver, sink, orchestrator) =
        common::mock_orchestrator(MockDriver::new(), MemoryReportSink::failing(), tmp.path());

    let entries = (0..3)
        .map(|i| SuiteEntry::new(TestCase::ui(format!("ui-{}", i)), |_scope| async move { Ok(()) }))
        .collect();
    let summary = orchestrator.run_suite(entries).await.unwrap();

    assert_eq!(summary.passed, 3);
    assert_eq!(sink.emit_calls(), 3);
    assert_eq!(driver.sessions().len(), 3);
    assert!(driver.sessions().iter().all(|s| s.quit_calls() == 1));
    assert!(!orchestrator.registry().is_active());
}

/// Scenario: database test fails; no media, no browser release
#[tokio::test]
async fn test_db_failure_reports_without_screenshot() {
    let tmp = tempfile::tempdir().unwrap();
    let seed = tmp.path().join("product.json");
    std::fs::write(&seed, r#"[{"id": 1, "name": "Sauce Labs Backpack", "price": 29.99}]"#).unwrap();

    let (driver, sink, orchestrator) =
        common::mock_orchestrator(MockDriver::new(), MemoryReportSink::new(), tmp.path());
    let storage = Arc::new(MemoryStorage::new().with_seed(&seed));
    let orchestrator = orchestrator.with_storage(storage.clone());

    let outcome = orchestrator
        .run(TestCase::db("price_update").category("Products"), |scope| async move {
            let products = scope.storage()?.all("product").await?;
            anyhow::ensure!(products[0]["price"] == 19.99, "price was not updated");
            Ok(())
        })
        .await
        .unwrap();

    assert!(outcome.is_failed());
    assert!(outcome.artifact().is_none());
    assert_eq!(driver.create_calls(), 0);

    let record = sink.record("price_update").unwrap();
    assert_eq!(record.summary, "Database Test Failed: price was not updated");
    assert!(record.categories.contains("Database Tests"));
    assert!(record.categories.contains("Products"));
    assert!(storage.contexts().iter().all(|c| c.is_disposed()));
}

/// Scenario: body asks for a session it was never given
#[tokio::test]
async fn test_api_body_touching_browser_fails_not_initialized() {
    let tmp = tempfile::tempdir().unwrap();
    let (_driver, sink, orchestrator) =
        common::mock_orchestrator(MockDriver::new(), MemoryReportSink::new(), tmp.path());

    let outcome = orchestrator
        .run(TestCase::api("confused"), |scope| async move {
            scope.navigate("https://example.com").await?;
            Ok(())
        })
        .await
        .unwrap();

    assert!(outcome.is_failed());
    assert_eq!(outcome.message(), Some(Error::NotInitialized.to_string().as_str()));
    assert_eq!(sink.count(TestStatus::Failed), 1);
}
