//! JSON report file
//!
//! Records accumulate in memory and are written as one document on flush:
//! run metadata, a status summary and every record in emission order. The
//! file name is fixed when the sink is created, so repeated flushes rewrite
//! the same report.

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::{append_to_last, ReportRecord, ReportSink, Step, TestStatus};
use crate::artifacts::TIMESTAMP_FORMAT;
use crate::config::Config;
use crate::{Error, Result};

/// Environment the run executed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub environment: String,
    pub browser: String,
    pub screen_size: String,
}

impl From<&Config> for SystemInfo {
    fn from(config: &Config) -> Self {
        Self {
            environment: config.environment.clone(),
            browser: config.browser.to_string(),
            screen_size: config.viewport.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    system_info: &'a SystemInfo,
    started_at: DateTime<Utc>,
    written_at: DateTime<Utc>,
    summary: Summary,
    tests: &'a [ReportRecord],
}

/// Report sink writing a JSON file
#[derive(Debug)]
pub struct JsonReportSink {
    path: PathBuf,
    system_info: SystemInfo,
    started_at: DateTime<Utc>,
    records: Mutex<Vec<ReportRecord>>,
}

impl JsonReportSink {
    /// Create a sink writing `report_<timestamp>.json` under `dir`
    pub fn new(dir: impl AsRef<Path>, system_info: SystemInfo) -> Self {
        let file = format!("report_{}.json", Local::now().format(TIMESTAMP_FORMAT));
        Self {
            path: dir.as_ref().join(file),
            system_info,
            started_at: Utc::now(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Report file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn system_info(&self) -> &SystemInfo {
        &self.system_info
    }

    fn render(&self) -> Result<Vec<u8>> {
        let records = self
            .records
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;

        let mut summary = Summary {
            total: records.len(),
            ..Summary::default()
        };
        for record in records.iter() {
            match record.outcome.status() {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
            }
        }

        let document = ReportDocument {
            system_info: &self.system_info,
            started_at: self.started_at,
            written_at: Utc::now(),
            summary,
            tests: records.as_slice(),
        };
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}

#[async_trait]
impl ReportSink for JsonReportSink {
    async fn emit(&self, record: ReportRecord) -> Result<()> {
        debug!("Recording {} as {}", record.test_name, record.outcome.status());
        self.records
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .push(record);
        Ok(())
    }

    async fn append_steps(&self, test_name: &str, steps: Vec<Step>) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        append_to_last(&mut records, test_name, steps)
    }

    async fn flush(&self) -> Result<()> {
        let body = self.render()?;

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::report(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        tokio::fs::write(&self.path, body).await.map_err(|e| {
            Error::report(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        info!("Report written to {}", self.path.display());
        Ok(())
    }
}
