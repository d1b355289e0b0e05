//! Screenshot persistence
//!
//! Screenshots land in one directory, created on first use, named
//! `{test}_{yyyy-MM-dd_HH-mm-ss}.png`. A second capture for the same test
//! within the same second gets a numeric suffix instead of overwriting.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::driver::DriverHandle;
use crate::{Error, Result};

/// Timestamp format used in screenshot file names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Screenshot directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `dir`; nothing is created until the first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File stem for a test at a given instant
    pub fn file_stem(name: &str, at: DateTime<Local>) -> String {
        format!("{}_{}", sanitize(name), at.format(TIMESTAMP_FORMAT))
    }

    /// Persist PNG bytes for `name` and return the written path
    pub async fn save(&self, name: &str, png: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::screenshot(format!(
                "Failed to create directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.free_path(&Self::file_stem(name, Local::now())).await?;
        tokio::fs::write(&path, png)
            .await
            .map_err(|e| Error::screenshot(format!("Failed to write {}: {}", path.display(), e)))?;

        info!("Screenshot saved: {}", path.display());
        Ok(path)
    }

    /// Capture the session's viewport and persist it
    pub async fn capture(&self, handle: &dyn DriverHandle, name: &str) -> Result<PathBuf> {
        debug!("Capturing screenshot for {}", name);
        let png = handle
            .screenshot()
            .await
            .map_err(|e| match e {
                Error::Screenshot(_) => e,
                other => Error::screenshot(other.to_string()),
            })?;
        self.save(name, &png).await
    }

    async fn free_path(&self, stem: &str) -> Result<PathBuf> {
        let mut path = self.dir.join(format!("{}.png", stem));
        let mut n = 2;
        while tokio::fs::try_exists(&path).await? {
            path = self.dir.join(format!("{}_{}.png", stem, n));
            n += 1;
        }
        Ok(path)
    }
}

/// Keep file names portable
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        "screenshot".to_string()
    } else {
        cleaned
    }
}
