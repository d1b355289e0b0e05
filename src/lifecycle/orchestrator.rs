//! Lifecycle orchestrator implementation

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{LifecycleState, Skip, TestCase, TestKind, TestScope};
use crate::api::ApiClient;
use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::driver::BrowserDriver;
use crate::report::{categorize, ReportRecord, ReportSink, StepLog, TestOutcome, TestStatus};
use crate::session::{
    navigate_to, BrowserKind, Release, ResourceAcquirer, Session, SessionRegistry, ViewportProfile,
    DEFAULT_MAX_ATTEMPTS,
};
use crate::storage::{MemoryStorage, StorageContext, StorageProvider};
use crate::Result;

/// Per-run settings for UI setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub browser: BrowserKind,
    pub viewport: ViewportProfile,
    pub base_url: String,
    pub max_attempts: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            browser: BrowserKind::default(),
            viewport: ViewportProfile::default(),
            base_url: "https://www.saucedemo.com/".to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl From<&Config> for RunSettings {
    fn from(config: &Config) -> Self {
        Self {
            browser: config.browser,
            viewport: config.viewport,
            base_url: config.base_url.clone(),
            max_attempts: config.max_attempts,
        }
    }
}

/// Boxed test body, for suites mixing different closures
pub type TestBody = Box<dyn FnOnce(TestScope) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// A test case paired with its body
pub struct SuiteEntry {
    pub case: TestCase,
    body: TestBody,
}

impl SuiteEntry {
    pub fn new<F, Fut>(case: TestCase, body: F) -> Self
    where
        F: FnOnce(TestScope) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            case,
            body: Box::new(move |scope| body(scope).boxed()),
        }
    }
}

impl fmt::Debug for SuiteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteEntry").field("case", &self.case).finish()
    }
}

/// Result counts of a suite run
#[derive(Debug, Clone, Default)]
pub struct SuiteSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<(String, TestOutcome)>,
}

impl SuiteSummary {
    fn record(&mut self, name: String, outcome: TestOutcome) {
        match outcome.status() {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Skipped => self.skipped += 1,
        }
        self.outcomes.push((name, outcome));
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// No test failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Quits the session if a run is dropped between acquisition and teardown
struct ReleaseGuard {
    registry: Arc<SessionRegistry>,
    session_id: String,
    armed: bool,
}

impl ReleaseGuard {
    fn new(registry: Arc<SessionRegistry>, session_id: String) -> Self {
        Self {
            registry,
            session_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(session) = self.registry.take_matching(&self.session_id) else {
            return;
        };

        warn!("Test run dropped before teardown; releasing session {}", session.id());
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = session.driver().quit().await {
                        warn!("Error during session cleanup: {}", e);
                    }
                });
            }
            Err(_) => warn!("No runtime to quit session {}; browser may be left running", session.id()),
        }
    }
}

/// What setup produced for one test
#[derive(Default)]
struct Fixture {
    session: Option<Arc<Session>>,
    storage: Option<Arc<dyn StorageContext>>,
    guard: Option<ReleaseGuard>,
}

/// Lifecycle orchestrator
#[derive(Debug)]
pub struct LifecycleOrchestrator {
    acquirer: Arc<ResourceAcquirer>,
    sink: Arc<dyn ReportSink>,
    storage: Arc<dyn StorageProvider>,
    artifacts: ArtifactStore,
    api: Option<Arc<ApiClient>>,
    settings: RunSettings,
}

impl LifecycleOrchestrator {
    /// Create an orchestrator with its own registry, in-memory storage and
    /// the default screenshot directory
    pub fn new(driver: Arc<dyn BrowserDriver>, sink: Arc<dyn ReportSink>, settings: RunSettings) -> Self {
        let acquirer = ResourceAcquirer::new(driver, Arc::new(SessionRegistry::new()));
        Self {
            acquirer: Arc::new(acquirer),
            sink,
            storage: Arc::new(MemoryStorage::new()),
            artifacts: ArtifactStore::new("Screenshots"),
            api: None,
            settings,
        }
    }

    /// Build everything a run needs from configuration
    pub fn from_config(config: &Config, driver: Arc<dyn BrowserDriver>, sink: Arc<dyn ReportSink>) -> Result<Self> {
        config.validate()?;

        let acquirer = ResourceAcquirer::new(driver, Arc::new(SessionRegistry::new()))
            .with_wait_config(config.wait_config())
            .with_retry_delay(config.retry_delay());

        let storage = match &config.storage_seed {
            Some(seed) => MemoryStorage::new().with_seed(seed),
            None => MemoryStorage::new(),
        };

        let api = match &config.api_base_url {
            Some(url) => Some(Arc::new(ApiClient::new(url.clone(), config.default_timeout())?)),
            None => None,
        };

        Ok(Self {
            acquirer: Arc::new(acquirer),
            sink,
            storage: Arc::new(storage),
            artifacts: ArtifactStore::new(&config.screenshot_dir),
            api,
            settings: RunSettings::from(config),
        })
    }

    pub fn with_acquirer(mut self, acquirer: Arc<ResourceAcquirer>) -> Self {
        self.acquirer = acquirer;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn StorageProvider>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactStore) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_api(mut self, api: ApiClient) -> Self {
        self.api = Some(Arc::new(api));
        self
    }

    pub fn acquirer(&self) -> &Arc<ResourceAcquirer> {
        &self.acquirer
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.acquirer.registry()
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run one test through setup, body and teardown
    ///
    /// Failures of setup or body become the returned outcome. The only error
    /// is an internal lifecycle violation.
    #[instrument(skip_all, fields(test = %case.name, kind = %case.kind))]
    pub async fn run<F, Fut>(&self, case: TestCase, body: F) -> Result<TestOutcome>
    where
        F: FnOnce(TestScope) -> Fut + Send,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        let started_at = Utc::now();
        let steps = StepLog::new();
        let categories = categorize(&case.categories, case.kind.category());
        let mut state = LifecycleState::Idle;

        if case.skipped {
            transition(&case, &mut state, LifecycleState::TornDown)?;
            let outcome = TestOutcome::skipped(case.skip_reason.clone());
            let outcome = self
                .tear_down(&case, outcome, Fixture::default(), &steps, categories, started_at)
                .await;
            return Ok(outcome);
        }

        transition(&case, &mut state, LifecycleState::SetUp)?;
        info!("Test Setup: Starting test - {}", case.name);
        steps.info(format!("Test Setup: Starting test - {}", case.name));

        let mut fixture = Fixture::default();
        let outcome = match self.set_up(&case, &steps, &mut fixture).await {
            Ok(()) => {
                transition(&case, &mut state, LifecycleState::Running)?;
                let scope = TestScope::new(
                    case.name.clone(),
                    case.kind,
                    fixture.session.clone(),
                    fixture.storage.clone(),
                    self.api.clone(),
                    self.artifacts.clone(),
                    steps.clone(),
                );
                execute(&case, scope, body).await
            }
            Err(e) => {
                error!("Setup failed for {}: {}", case.name, e);
                TestOutcome::failed(format!("Setup failed: {}", e))
            }
        };

        transition(&case, &mut state, LifecycleState::TornDown)?;
        Ok(self
            .tear_down(&case, outcome, fixture, &steps, categories, started_at)
            .await)
    }

    /// Run cases in order
    pub async fn run_suite(&self, entries: Vec<SuiteEntry>) -> Result<SuiteSummary> {
        info!("Running {} test(s)", entries.len());
        let mut summary = SuiteSummary::default();

        for SuiteEntry { case, body } in entries {
            let name = case.name.clone();
            let outcome = self.run(case, body).await?;
            summary.record(name, outcome);
        }

        info!(
            "Suite finished: {} passed, {} failed, {} skipped",
            summary.passed, summary.failed, summary.skipped
        );
        Ok(summary)
    }

    /// Flush the report sink
    pub async fn finish(&self) -> Result<()> {
        self.sink.flush().await
    }

    async fn set_up(&self, case: &TestCase, steps: &StepLog, fixture: &mut Fixture) -> Result<()> {
        match case.kind {
            TestKind::Ui => {
                let session = self
                    .acquirer
                    .acquire(
                        self.settings.browser,
                        self.settings.viewport,
                        self.settings.max_attempts,
                    )
                    .await?;
                fixture.guard = Some(ReleaseGuard::new(
                    self.registry().clone(),
                    session.id().to_string(),
                ));
                fixture.session = Some(session.clone());
                steps.info(format!(
                    "Browser session started: {} ({})",
                    session.kind(),
                    session.viewport()
                ));

                navigate_to(session.driver().as_ref(), &self.settings.base_url).await?;
                steps.info(format!("Navigated to {}", self.settings.base_url));
            }
            TestKind::Api => {
                if self.api.is_none() {
                    debug!("No API client configured for {}", case.name);
                }
            }
            TestKind::Db => {
                let storage = self.storage.open(&case.name).await?;
                for (level, message) in storage.setup_notes() {
                    steps.log(level, message);
                }
                steps.info(format!("Database setup complete: {}", storage.name()));
                fixture.storage = Some(storage);
            }
        }
        Ok(())
    }

    async fn tear_down(
        &self,
        case: &TestCase,
        outcome: TestOutcome,
        mut fixture: Fixture,
        steps: &StepLog,
        categories: BTreeSet<String>,
        started_at: DateTime<Utc>,
    ) -> TestOutcome {
        let outcome = match (case.kind, outcome.status()) {
            (TestKind::Ui, TestStatus::Passed | TestStatus::Failed) => {
                self.attach_screenshot(case, fixture.session.as_deref(), steps, outcome)
                    .await
            }
            _ => outcome,
        };

        let summary = case.kind.summary(&outcome);
        match outcome.status() {
            TestStatus::Passed => steps.info(summary.clone()),
            TestStatus::Failed => steps.error(summary.clone()),
            TestStatus::Skipped => steps.warning(summary.clone()),
        }
        info!("{}: {}", case.name, summary);

        let record = ReportRecord {
            test_name: case.name.clone(),
            kind: case.kind.to_string(),
            outcome: outcome.clone(),
            summary,
            categories,
            steps: steps.snapshot(),
            started_at,
            finished_at: Utc::now(),
        };
        let emitted = match self.sink.emit(record).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to record result for {}: {}", case.name, e);
                false
            }
        };

        let cleanup = StepLog::new();
        if fixture.session.take().is_some() {
            match self.acquirer.release().await {
                Release::Closed(_) => cleanup.info("Browser session closed."),
                Release::QuitFailed { cause, .. } => {
                    cleanup.warning(format!("Browser session did not close cleanly: {}", cause))
                }
                Release::Idle => cleanup.warning("No browser session was active at teardown"),
            }
        }
        if let Some(mut guard) = fixture.guard.take() {
            guard.disarm();
        }
        if let Some(storage) = fixture.storage.take() {
            match storage.dispose().await {
                Ok(()) => {
                    debug!("Storage context {} disposed", storage.name());
                    cleanup.info("Database teardown complete.");
                }
                Err(e) => {
                    warn!("Failed to dispose storage context {}: {}", storage.name(), e);
                    cleanup.error(format!("Database teardown failed: {}", e));
                }
            }
        }

        let cleanup = cleanup.snapshot();
        if emitted && !cleanup.is_empty() {
            if let Err(e) = self.sink.append_steps(&case.name, cleanup).await {
                warn!("Failed to record teardown steps for {}: {}", case.name, e);
            }
        }

        outcome
    }

    /// Screenshot failures are logged and leave the outcome as it was
    async fn attach_screenshot(
        &self,
        case: &TestCase,
        session: Option<&Session>,
        steps: &StepLog,
        outcome: TestOutcome,
    ) -> TestOutcome {
        let Some(session) = session else {
            warn!("No browser session for {}; skipping screenshot", case.name);
            return outcome;
        };

        match self.artifacts.capture(session.driver().as_ref(), &case.name).await {
            Ok(path) => {
                steps.info(format!("Screenshot saved to {}", path.display()));
                outcome.with_artifact(path)
            }
            Err(e) => {
                error!("Failed to capture screenshot for {}: {}", case.name, e);
                steps.error(format!("Screenshot capture failed: {}", e));
                outcome
            }
        }
    }
}

fn transition(case: &TestCase, state: &mut LifecycleState, next: LifecycleState) -> Result<()> {
    *state = state.advance(next)?;
    debug!("{}: entered {}", case.name, state);
    Ok(())
}

async fn execute<F, Fut>(case: &TestCase, scope: TestScope, body: F) -> TestOutcome
where
    F: FnOnce(TestScope) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let result = AssertUnwindSafe(async move { body(scope).await })
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(())) => TestOutcome::passed(),
        Ok(Err(e)) => match e.downcast_ref::<Skip>() {
            Some(skip) => {
                info!("{} skipped itself", case.name);
                TestOutcome::skipped(skip.reason.clone())
            }
            None => {
                error!("{} failed: {:#}", case.name, e);
                TestOutcome::failed(format!("{:#}", e))
            }
        },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("{} panicked: {}", case.name, message);
            TestOutcome::failed(message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "test body panicked".to_string()
    }
}
