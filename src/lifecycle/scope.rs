//! What a running test body can reach

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::TestKind;
use crate::api::ApiClient;
use crate::artifacts::ArtifactStore;
use crate::driver::DriverHandle;
use crate::report::StepLog;
use crate::session::{navigate_to, Session};
use crate::storage::StorageContext;
use crate::wait::WaitEngine;
use crate::{Error, Result};

/// Resources handed to a test body
///
/// UI tests get the acquired session, DB tests their storage context, API
/// tests the API client when one is configured. Asking for a resource the
/// test's kind does not provide is an error, not a panic.
#[derive(Debug, Clone)]
pub struct TestScope {
    name: String,
    kind: TestKind,
    session: Option<Arc<Session>>,
    storage: Option<Arc<dyn StorageContext>>,
    api: Option<Arc<ApiClient>>,
    artifacts: ArtifactStore,
    steps: StepLog,
}

impl TestScope {
    pub(crate) fn new(
        name: String,
        kind: TestKind,
        session: Option<Arc<Session>>,
        storage: Option<Arc<dyn StorageContext>>,
        api: Option<Arc<ApiClient>>,
        artifacts: ArtifactStore,
        steps: StepLog,
    ) -> Self {
        Self {
            name,
            kind,
            session,
            storage,
            api,
            artifacts,
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    /// The browser session (UI tests)
    pub fn session(&self) -> Result<&Arc<Session>> {
        self.session.as_ref().ok_or(Error::NotInitialized)
    }

    pub fn driver(&self) -> Result<&Arc<dyn DriverHandle>> {
        Ok(self.session()?.driver())
    }

    pub fn wait(&self) -> Result<&WaitEngine> {
        Ok(self.session()?.wait())
    }

    /// Navigate the session; blank URLs are rejected
    pub async fn navigate(&self, url: &str) -> Result<()> {
        navigate_to(self.driver()?.as_ref(), url).await
    }

    /// The per-test storage context (DB tests)
    pub fn storage(&self) -> Result<&Arc<dyn StorageContext>> {
        self.storage
            .as_ref()
            .ok_or_else(|| Error::storage(format!("{} has no storage context", self.name)))
    }

    /// The API client (API tests with a configured base URL)
    pub fn api(&self) -> Result<&ApiClient> {
        self.api
            .as_deref()
            .ok_or_else(|| Error::configuration("api_base_url is not configured"))
    }

    /// Append an info step to the report
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!("[{}] {}", self.name, message);
        self.steps.info(message);
    }

    /// Save a screenshot named `{test}_{label}` and log it as a step
    pub async fn capture_screenshot(&self, label: &str) -> Result<PathBuf> {
        let name = format!("{}_{}", self.name, label);
        let path = self.artifacts.capture(self.driver()?.as_ref(), &name).await?;
        self.steps
            .info(format!("Screenshot '{}' saved to {}", label, path.display()));
        Ok(path)
    }
}
