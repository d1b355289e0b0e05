//! In-memory storage provider
//!
//! Each context is named `{test}_{uuid}` and optionally seeded from a JSON
//! array file. The collection takes the seed file's stem, so `product.json`
//! seeds `product`. Seeding never fails a context: a missing, unreadable or
//! malformed seed file is logged and the context starts empty. Those notes
//! surface as report steps through [`StorageContext::setup_notes`].

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use super::{StorageContext, StorageProvider};
use crate::report::StepLevel;
use crate::{Error, Result};

/// In-memory storage provider
#[derive(Debug, Default)]
pub struct MemoryStorage {
    seed: Option<PathBuf>,
    opened: Mutex<Vec<Arc<MemoryStorageContext>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed every new context from a JSON array file
    pub fn with_seed(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed = Some(path.into());
        self
    }

    /// Contexts opened so far
    pub fn contexts(&self) -> Vec<Arc<MemoryStorageContext>> {
        self.opened.lock().map(|c| c.clone()).unwrap_or_default()
    }

    async fn load_seed(path: &Path) -> Result<Option<(String, Vec<Value>)>> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let documents = match serde_json::from_slice::<Value>(&raw)? {
            Value::Array(items) => items,
            _ => {
                return Err(Error::storage(format!(
                    "Seed file {} must contain a JSON array",
                    path.display()
                )))
            }
        };

        let collection = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "seed".to_string());

        Ok(Some((collection, documents)))
    }

    async fn seed(context: &MemoryStorageContext, path: &Path) -> Result<()> {
        match Self::load_seed(path).await {
            Ok(Some((collection, documents))) if documents.is_empty() => {
                warn!("Seed file {} holds no {} records", path.display(), collection);
                context.note(StepLevel::Warning, format!("No {} records found to seed", collection));
            }
            Ok(Some((collection, documents))) => {
                info!(
                    "Seeding {} with {} {} document(s)",
                    context.name(),
                    documents.len(),
                    collection
                );
                context.note(
                    StepLevel::Info,
                    format!("Seeded {} {} record(s)", documents.len(), collection),
                );
                context.extend(&collection, documents)?;
            }
            Ok(None) => {
                warn!("Seed file not found: {}", path.display());
                context.note(StepLevel::Warning, format!("Seed file not found: {}", path.display()));
            }
            Err(e) => {
                error!("Error seeding {} from {}: {}", context.name(), path.display(), e);
                context.note(StepLevel::Error, format!("Error seeding database: {}", e));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn open(&self, test_name: &str) -> Result<Arc<dyn StorageContext>> {
        let context = Arc::new(MemoryStorageContext::new(format!(
            "{}_{}",
            test_name,
            uuid::Uuid::new_v4()
        )));

        if let Some(seed) = &self.seed {
            Self::seed(&context, seed).await?;
        }

        self.opened
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .push(context.clone());

        Ok(context as Arc<dyn StorageContext>)
    }
}

/// One in-memory storage context
#[derive(Debug)]
pub struct MemoryStorageContext {
    name: String,
    collections: Mutex<HashMap<String, Vec<Value>>>,
    notes: Mutex<Vec<(StepLevel, String)>>,
    disposed: AtomicBool,
}

impl MemoryStorageContext {
    fn new(name: String) -> Self {
        Self {
            name,
            collections: Mutex::new(HashMap::new()),
            notes: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::storage(format!("Context {} is disposed", self.name)));
        }
        Ok(())
    }

    fn note(&self, level: StepLevel, message: String) {
        match self.notes.lock() {
            Ok(mut notes) => notes.push((level, message)),
            Err(poisoned) => poisoned.into_inner().push((level, message)),
        }
    }

    fn extend(&self, collection: &str, documents: Vec<Value>) -> Result<()> {
        self.collections
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
        Ok(())
    }
}

#[async_trait]
impl StorageContext for MemoryStorageContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup_notes(&self) -> Vec<(StepLevel, String)> {
        self.notes.lock().map(|n| n.clone()).unwrap_or_default()
    }

    async fn insert(&self, collection: &str, document: Value) -> Result<()> {
        self.ensure_live()?;
        self.extend(collection, vec![document])
    }

    async fn all(&self, collection: &str) -> Result<Vec<Value>> {
        self.ensure_live()?;
        Ok(self
            .collections
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_by(&self, collection: &str, field: &str, value: &Value) -> Result<usize> {
        self.ensure_live()?;
        let mut collections = self
            .collections
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;

        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|doc| doc.get(field) != Some(value));
        Ok(before - documents.len())
    }

    async fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Ok(mut collections) = self.collections.lock() {
            collections.clear();
        }
        debug!("Disposed storage context {}", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        let storage = MemoryStorage::new();
        let a = storage.open("first").await.unwrap();
        let b = storage.open("first").await.unwrap();

        assert_ne!(a.name(), b.name());
        assert!(a.name().starts_with("first_"));

        a.insert("product", json!({"id": 1})).await.unwrap();
        assert_eq!(a.all("product").await.unwrap().len(), 1);
        assert!(b.all("product").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_from_json_array() {
        let tmp = tempfile::tempdir().unwrap();
        let seed = tmp.path().join("product.json");
        std::fs::write(
            &seed,
            r#"[{"id": 1, "name": "Backpack"}, {"id": 2, "name": "Bike Light"}]"#,
        )
        .unwrap();

        let storage = MemoryStorage::new().with_seed(&seed);
        let ctx = storage.open("seeded").await.unwrap();

        assert_eq!(ctx.all("product").await.unwrap().len(), 2);
        let found = ctx.find_by("product", "name", &json!("Bike Light")).await.unwrap();
        assert_eq!(found, vec![json!({"id": 2, "name": "Bike Light"})]);
    }

    #[tokio::test]
    async fn test_missing_seed_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new().with_seed(tmp.path().join("missing.json"));

        let ctx = storage.open("unseeded").await.unwrap();
        assert!(ctx.all("missing").await.unwrap().is_empty());
        assert_eq!(ctx.setup_notes()[0].0, StepLevel::Warning);
    }

    #[tokio::test]
    async fn test_malformed_seed_leaves_an_empty_context() {
        let tmp = tempfile::tempdir().unwrap();
        let seed = tmp.path().join("product.json");
        std::fs::write(&seed, "{ not json").unwrap();

        let ctx = MemoryStorage::new().with_seed(&seed).open("malformed").await.unwrap();

        assert!(ctx.all("product").await.unwrap().is_empty());
        let notes = ctx.setup_notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, StepLevel::Error);
        assert!(notes[0].1.starts_with("Error seeding database: "));
    }

    #[tokio::test]
    async fn test_non_array_seed_is_noted_as_error() {
        let tmp = tempfile::tempdir().unwrap();
        let seed = tmp.path().join("product.json");
        std::fs::write(&seed, r#"{"id": 1}"#).unwrap();

        let ctx = MemoryStorage::new().with_seed(&seed).open("bad").await.unwrap();
        let notes = ctx.setup_notes();
        assert_eq!(notes[0].0, StepLevel::Error);
        assert!(notes[0].1.contains("must contain a JSON array"));
    }

    #[tokio::test]
    async fn test_empty_seed_array_is_a_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let seed = tmp.path().join("product.json");
        std::fs::write(&seed, "[]").unwrap();

        let ctx = MemoryStorage::new().with_seed(&seed).open("empty").await.unwrap();
        assert_eq!(
            ctx.setup_notes(),
            vec![(StepLevel::Warning, "No product records found to seed".to_string())]
        );
    }

    #[tokio::test]
    async fn test_dispose_clears_and_blocks_access() {
        let storage = MemoryStorage::new();
        let ctx = storage.open("disposable").await.unwrap();
        ctx.insert("product", json!({"id": 7})).await.unwrap();
        assert_eq!(ctx.remove_by("product", "id", &json!(8)).await.unwrap(), 0);

        ctx.dispose().await.unwrap();
        ctx.dispose().await.unwrap();

        assert!(storage.contexts()[0].is_disposed());
        assert!(matches!(ctx.all("product").await, Err(Error::Storage(_))));
    }
}
