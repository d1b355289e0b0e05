//! Single-slot session registry
//!
//! Holds at most one active session per worker.

use std::sync::{Arc, Mutex};

use crate::session::Session;
use crate::{Error, Result};

/// Session registry
#[derive(Debug, Default)]
pub struct SessionRegistry {
    slot: Mutex<Option<Arc<Session>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session; fails if one is already active
    pub fn install(&self, session: Arc<Session>) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;

        if let Some(active) = slot.as_ref() {
            return Err(Error::DoubleAcquisition(active.id().to_string()));
        }

        *slot = Some(session);
        Ok(())
    }

    /// The active session
    pub fn current(&self) -> Result<Arc<Session>> {
        self.slot
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .clone()
            .ok_or(Error::NotInitialized)
    }

    /// Fail with `DoubleAcquisition` if a session is active
    pub fn ensure_vacant(&self) -> Result<()> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;

        match slot.as_ref() {
            Some(active) => Err(Error::DoubleAcquisition(active.id().to_string())),
            None => Ok(()),
        }
    }

    /// Remove and return the active session, if any
    pub fn take(&self) -> Option<Arc<Session>> {
        // Poisoning cannot corrupt an Option
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.take()
    }

    /// Remove the active session only if it is `id`
    pub fn take_matching(&self, id: &str) -> Option<Arc<Session>> {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.as_ref().is_some_and(|s| s.id() == id) {
            slot.take()
        } else {
            None
        }
    }

    /// Whether a session is active
    pub fn is_active(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{BrowserDriver, MockDriver};
    use crate::session::{BrowserKind, ViewportProfile};
    use crate::wait::{WaitConfig, WaitEngine};

    async fn session() -> Arc<Session> {
        let handle = MockDriver::new().create_session(BrowserKind::Chrome).await.unwrap();
        let wait = WaitEngine::new(handle.clone(), WaitConfig::default());
        Arc::new(Session::new(BrowserKind::Chrome, ViewportProfile::Desktop, handle, wait))
    }

    #[test]
    fn test_empty_registry_is_not_initialized() {
        let registry = SessionRegistry::new();
        assert!(!registry.is_active());
        assert!(matches!(registry.current(), Err(Error::NotInitialized)));
        assert!(registry.take().is_none());
    }

    #[tokio::test]
    async fn test_install_and_take() {
        let registry = SessionRegistry::new();
        let first = session().await;

        registry.install(first.clone()).unwrap();
        assert!(registry.is_active());
        assert_eq!(registry.current().unwrap().id(), first.id());

        let taken = registry.take().unwrap();
        assert_eq!(taken.id(), first.id());
        assert!(!registry.is_active());
    }

    #[tokio::test]
    async fn test_second_install_is_rejected() {
        let registry = SessionRegistry::new();
        let first = session().await;
        registry.install(first.clone()).unwrap();

        let err = registry.install(session().await).unwrap_err();
        assert!(matches!(err, Error::DoubleAcquisition(ref id) if id == first.id()));
        assert!(matches!(registry.ensure_vacant(), Err(Error::DoubleAcquisition(_))));

        // The original session is untouched
        assert_eq!(registry.current().unwrap().id(), first.id());
    }

    #[tokio::test]
    async fn test_take_matching_ignores_other_sessions() {
        let registry = SessionRegistry::new();
        let active = session().await;
        registry.install(active.clone()).unwrap();

        assert!(registry.take_matching("someone-else").is_none());
        assert!(registry.is_active());
        assert!(registry.take_matching(active.id()).is_some());
        assert!(!registry.is_active());
    }
}
