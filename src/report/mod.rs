//! # Report layer
//!
//! Append-only record of test outcomes. Every finished test produces one
//! [`ReportRecord`] carrying its outcome, categories, optional screenshot and
//! the steps logged while it ran.
//!
//! ## Module structure
//! - `memory`: in-memory sink, mostly for tests
//! - `json`: JSON file sink with run metadata, written on flush

pub mod memory;
pub mod json;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::{Error, Result};

pub use json::{JsonReportSink, SystemInfo};
pub use memory::MemoryReportSink;

/// Final status of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Outcome of one test
///
/// Fields are fixed at construction. Attaching an artifact yields a new
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    status: TestStatus,
    message: Option<String>,
    artifact: Option<PathBuf>,
}

impl TestOutcome {
    pub fn passed() -> Self {
        Self {
            status: TestStatus::Passed,
            message: None,
            artifact: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Failed,
            message: Some(message.into()),
            artifact: None,
        }
    }

    pub fn skipped(reason: Option<String>) -> Self {
        Self {
            status: TestStatus::Skipped,
            message: reason,
            artifact: None,
        }
    }

    /// Same outcome with a screenshot attached
    pub fn with_artifact(self, path: PathBuf) -> Self {
        Self {
            artifact: Some(path),
            ..self
        }
    }

    pub fn status(&self) -> TestStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    pub fn is_passed(&self) -> bool {
        self.status == TestStatus::Passed
    }

    pub fn is_failed(&self) -> bool {
        self.status == TestStatus::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.status == TestStatus::Skipped
    }
}

/// Severity of a logged step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepLevel {
    Info,
    Warning,
    Error,
}

/// One line of a test's step log
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub at: DateTime<Utc>,
    pub level: StepLevel,
    pub message: String,
}

/// Shared step log for the test in progress
#[derive(Debug, Clone, Default)]
pub struct StepLog {
    steps: Arc<Mutex<Vec<Step>>>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(StepLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(StepLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(StepLevel::Error, message);
    }

    /// Copy of the steps logged so far
    pub fn snapshot(&self) -> Vec<Step> {
        match self.steps.lock() {
            Ok(steps) => steps.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn log(&self, level: StepLevel, message: impl Into<String>) {
        let step = Step {
            at: Utc::now(),
            level,
            message: message.into(),
        };
        match self.steps.lock() {
            Ok(mut steps) => steps.push(step),
            Err(poisoned) => poisoned.into_inner().push(step),
        }
    }
}

/// Extend the most recent record named `test_name`
pub(crate) fn append_to_last(records: &mut [ReportRecord], test_name: &str, steps: Vec<Step>) -> Result<()> {
    let record = records
        .iter_mut()
        .rev()
        .find(|r| r.test_name == test_name)
        .ok_or_else(|| Error::report(format!("No record emitted for {}", test_name)))?;
    record.steps.extend(steps);
    Ok(())
}

/// Merge declared categories with the category implied by the test kind
///
/// Blank names are dropped and duplicates collapse.
pub fn categorize<S: AsRef<str>>(declared: &[S], implied: Option<&str>) -> BTreeSet<String> {
    declared
        .iter()
        .map(|c| c.as_ref())
        .chain(implied)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// One finished test
#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub test_name: String,
    pub kind: String,
    pub outcome: TestOutcome,
    /// Status line, e.g. "Test Passed" or "Database Test Failed: ..."
    pub summary: String,
    pub categories: BTreeSet<String>,
    pub steps: Vec<Step>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Destination for test records
///
/// Records are only appended. Implementations serialize concurrent emits.
#[async_trait]
pub trait ReportSink: Send + Sync + fmt::Debug {
    /// Append one record
    async fn emit(&self, record: ReportRecord) -> Result<()>;

    /// Append teardown steps to the last record emitted for `test_name`
    ///
    /// Release and disposal happen after the record is emitted; sinks that
    /// keep records around attach those steps here.
    async fn append_steps(&self, _test_name: &str, _steps: Vec<Step>) -> Result<()> {
        Ok(())
    }

    /// Persist everything emitted so far
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_merges_and_dedups() {
        let categories = categorize(&["Smoke", " Login ", "", "Smoke"], Some("ApiTests"));
        let expected: BTreeSet<String> = ["ApiTests", "Login", "Smoke"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(categories, expected);
    }

    #[test]
    fn test_categorize_without_declarations() {
        let none: [&str; 0] = [];
        assert!(categorize(&none, None).is_empty());
        assert_eq!(categorize(&none, Some("Database Tests")).len(), 1);
    }

    #[test]
    fn test_outcome_with_artifact_keeps_status() {
        let outcome = TestOutcome::failed("boom").with_artifact(PathBuf::from("a.png"));
        assert!(outcome.is_failed());
        assert_eq!(outcome.message(), Some("boom"));
        assert_eq!(outcome.artifact(), Some(Path::new("a.png")));
    }

    #[test]
    fn test_step_log_is_shared_between_clones() {
        let log = StepLog::new();
        let clone = log.clone();
        log.info("first");
        clone.error("second");

        let steps = log.snapshot();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].level, StepLevel::Error);
    }

    #[test]
    fn test_append_to_last_targets_latest_record() {
        let record = |outcome: TestOutcome| ReportRecord {
            test_name: "retry_me".to_string(),
            kind: "UI".to_string(),
            outcome,
            summary: String::new(),
            categories: BTreeSet::new(),
            steps: Vec::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        let mut records = vec![record(TestOutcome::failed("first")), record(TestOutcome::passed())];

        let log = StepLog::new();
        log.info("Browser session closed.");
        append_to_last(&mut records, "retry_me", log.snapshot()).unwrap();

        assert!(records[0].steps.is_empty());
        assert_eq!(records[1].steps[0].message, "Browser session closed.");
        assert!(matches!(
            append_to_last(&mut records, "unknown", Vec::new()),
            Err(Error::Report(_))
        ));
    }
}
