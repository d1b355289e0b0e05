//! # Test lifecycle
//!
//! Per-test control flow: classify the test, set up what its kind needs, run
//! the body, tear down.
//!
//! ## States
//! `Idle -> SetUp -> Running -> TornDown`. A failed setup goes straight to
//! `TornDown`, as does a test declared skipped. `TornDown` is reached on every
//! path.
//!
//! ## Teardown order
//! Screenshot (UI, unless skipped), then the report record, then resource
//! release. A failing screenshot or report never prevents the release. The
//! release and storage disposal results are appended to the emitted record
//! as closing steps.
//!
//! ## Usage
//! ```rust,no_run
//! use harness_oxide::driver::{Locator, MockDriver};
//! use harness_oxide::lifecycle::{LifecycleOrchestrator, RunSettings, TestCase};
//! use harness_oxide::report::MemoryReportSink;
//! use std::sync::Arc;
//!
//! # async fn example() -> harness_oxide::Result<()> {
//! let orchestrator = LifecycleOrchestrator::new(
//!     Arc::new(MockDriver::new()),
//!     Arc::new(MemoryReportSink::new()),
//!     RunSettings::default(),
//! );
//!
//! let outcome = orchestrator
//!     .run(TestCase::ui("login").category("Smoke"), |scope| async move {
//!         let field = scope.wait()?.element_visible(&Locator::id("user-name"), None).await?;
//!         scope.driver()?.send_keys(&field, "standard_user").await?;
//!         Ok(())
//!     })
//!     .await?;
//! assert!(outcome.is_passed());
//! # Ok(())
//! # }
//! ```

pub mod scope;
pub mod orchestrator;


use serde::Serialize;
use std::fmt;

use crate::{Error, Result};

pub use orchestrator::{LifecycleOrchestrator, RunSettings, SuiteEntry, SuiteSummary, TestBody};
pub use scope::TestScope;

/// What a test exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TestKind {
    Ui,
    Api,
    Db,
}

impl TestKind {
    /// Report category added automatically for this kind
    pub fn category(&self) -> Option<&'static str> {
        match self {
            TestKind::Ui => None,
            TestKind::Api => Some("ApiTests"),
            TestKind::Db => Some("Database Tests"),
        }
    }

    /// Status line for the report
    pub fn summary(&self, outcome: &crate::report::TestOutcome) -> String {
        use crate::report::TestStatus;

        let subject = match self {
            TestKind::Db => "Database Test",
            TestKind::Ui | TestKind::Api => "Test",
        };
        match (outcome.status(), outcome.message()) {
            (TestStatus::Passed, _) => format!("{} Passed", subject),
            (TestStatus::Failed, Some(msg)) => format!("{} Failed: {}", subject, msg),
            (TestStatus::Failed, None) => format!("{} Failed", subject),
            (TestStatus::Skipped, Some(reason)) => format!("{} Skipped: {}", subject, reason),
            (TestStatus::Skipped, None) => format!("{} Skipped", subject),
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestKind::Ui => "ui",
            TestKind::Api => "api",
            TestKind::Db => "db",
        };
        f.write_str(name)
    }
}

/// A declared test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub kind: TestKind,
    pub categories: Vec<String>,
    /// Declared skipped; the body never runs
    pub skipped: bool,
    pub skip_reason: Option<String>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, kind: TestKind) -> Self {
        Self {
            name: name.into(),
            kind,
            categories: Vec::new(),
            skipped: false,
            skip_reason: None,
        }
    }

    pub fn ui(name: impl Into<String>) -> Self {
        Self::new(name, TestKind::Ui)
    }

    pub fn api(name: impl Into<String>) -> Self {
        Self::new(name, TestKind::Api)
    }

    pub fn db(name: impl Into<String>) -> Self {
        Self::new(name, TestKind::Db)
    }

    /// Declare a report category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Declare the test skipped
    pub fn skip(mut self) -> Self {
        self.skipped = true;
        self
    }

    /// Declare the test skipped with a reason
    pub fn skip_because(mut self, reason: impl Into<String>) -> Self {
        self.skipped = true;
        self.skip_reason = Some(reason.into());
        self
    }
}

/// Lifecycle state of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    SetUp,
    Running,
    TornDown,
}

impl LifecycleState {
    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn advance(self, next: LifecycleState) -> Result<LifecycleState> {
        use LifecycleState::*;

        match (self, next) {
            (Idle, SetUp) | (Idle, TornDown) | (SetUp, Running) | (SetUp, TornDown)
            | (Running, TornDown) => Ok(next),
            (from, to) => Err(Error::internal(format!(
                "Invalid lifecycle transition {:?} -> {:?}",
                from, to
            ))),
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Returned by a test body to mark itself skipped
///
/// ```rust,no_run
/// # use harness_oxide::lifecycle::Skip;
/// # fn body() -> anyhow::Result<()> {
/// return Err(Skip::because("feature flag off").into());
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub reason: Option<String>,
}

impl Skip {
    pub fn because(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "skipped: {}", reason),
            None => f.write_str("skipped"),
        }
    }
}

impl std::error::Error for Skip {}
