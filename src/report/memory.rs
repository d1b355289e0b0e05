//! In-memory report sink

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use super::{append_to_last, ReportRecord, ReportSink, Step, TestStatus};
use crate::{Error, Result};

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    records: Mutex<Vec<ReportRecord>>,
    fail_emit: AtomicBool,
    emit_calls: AtomicU32,
    flush_calls: AtomicU32,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every emit fail without storing the record
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.fail_emit.store(true, Ordering::SeqCst);
        sink
    }

    /// Records emitted so far, in order
    pub fn records(&self) -> Vec<ReportRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// The record for `test_name`, if emitted
    pub fn record(&self, test_name: &str) -> Option<ReportRecord> {
        self.records().into_iter().find(|r| r.test_name == test_name)
    }

    pub fn count(&self, status: TestStatus) -> usize {
        self.records()
            .iter()
            .filter(|r| r.outcome.status() == status)
            .count()
    }

    pub fn emit_calls(&self) -> u32 {
        self.emit_calls.load(Ordering::SeqCst)
    }

    pub fn flush_calls(&self) -> u32 {
        self.flush_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn emit(&self, record: ReportRecord) -> Result<()> {
        self.emit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_emit.load(Ordering::SeqCst) {
            return Err(Error::report(format!(
                "report store unavailable for {}",
                record.test_name
            )));
        }

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
        self.flush_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
