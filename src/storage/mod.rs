//! # Per-test storage
//!
//! Database-kind tests get a fresh, uniquely named storage context for the
//! duration of one test. The orchestrator opens it during setup and disposes
//! it in teardown, whatever the test outcome.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

use crate::report::StepLevel;
use crate::Result;

pub use memory::{MemoryStorage, MemoryStorageContext};

/// Opens storage contexts
#[async_trait]
pub trait StorageProvider: Send + Sync + Debug {
    /// Open a context dedicated to `test_name`
    async fn open(&self, test_name: &str) -> Result<Arc<dyn StorageContext>>;
}

/// An isolated set of JSON collections
#[async_trait]
pub trait StorageContext: Send + Sync + Debug {
    /// Unique context name
    fn name(&self) -> &str;

    /// Messages produced while the context was prepared, for the report
    fn setup_notes(&self) -> Vec<(StepLevel, String)> {
        Vec::new()
    }

    /// Append a document to a collection
    async fn insert(&self, collection: &str, document: Value) -> Result<()>;

    /// Every document in a collection, in insertion order
    async fn all(&self, collection: &str) -> Result<Vec<Value>>;

    /// Documents whose `field` equals `value`
    async fn find_by(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>> {
        Ok(self
            .all(collection)
            .await?
            .into_iter()
            .filter(|doc| doc.get(field) == Some(value))
            .collect())
    }

    /// Remove every document whose `field` equals `value`; returns how many
    async fn remove_by(&self, collection: &str, field: &str, value: &Value) -> Result<usize>;

    /// Drop all data; further calls fail
    async fn dispose(&self) -> Result<()>;
}
