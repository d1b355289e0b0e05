//! Unified error types for Harness-Oxide

use std::time::Duration;
use thiserror::Error;

use crate::session::BrowserKind;
use crate::wait::WaitKind;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Harness-Oxide
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Browser driver errors
    #[error("Driver error: {0}")]
    Driver(String),

    /// An element reference no longer points into the current document
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// Session creation failed on every attempt of the retry budget
    #[error("Failed to acquire {kind} session after {attempts} attempt(s): {last_cause}")]
    Acquisition {
        kind: BrowserKind,
        attempts: u32,
        last_cause: String,
    },

    /// A session was requested while another one is still active
    #[error("A browser session is already active (id {0}); release it before acquiring another")]
    DoubleAcquisition(String),

    /// The registry was read before any session was acquired
    #[error("No active browser session; acquire one before use")]
    NotInitialized,

    /// A wait condition never produced a value before its deadline
    #[error("{kind} wait timed out after {timeout:?}: {target}")]
    WaitTimeout {
        kind: WaitKind,
        target: String,
        timeout: Duration,
    },

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Screenshot capture or persistence failed
    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    /// Report sink errors
    #[error("Report error: {0}")]
    Report(String),

    /// Per-test storage context errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new driver error
    pub fn driver<S: Into<String>>(msg: S) -> Self {
        Error::Driver(msg.into())
    }

    /// Create a new stale element error
    pub fn stale_element<S: Into<String>>(msg: S) -> Self {
        Error::StaleElement(msg.into())
    }

    /// Create a new navigation error
    pub fn navigation<S: Into<String>>(msg: S) -> Self {
        Error::Navigation(msg.into())
    }

    /// Create a new screenshot error
    pub fn screenshot<S: Into<String>>(msg: S) -> Self {
        Error::Screenshot(msg.into())
    }

    /// Create a new report error
    pub fn report<S: Into<String>>(msg: S) -> Self {
        Error::Report(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Error::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Create a new wait timeout error
    pub fn wait_timeout<S: Into<String>>(kind: WaitKind, target: S, timeout: Duration) -> Self {
        Error::WaitTimeout {
            kind,
            target: target.into(),
            timeout,
        }
    }

    /// The wait kind, if this is a wait timeout
    pub fn wait_kind(&self) -> Option<WaitKind> {
        match self {
            Error::WaitTimeout { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The element was detached between lookup and use
    pub fn is_stale_element(&self) -> bool {
        matches!(self, Error::StaleElement(_))
    }

    /// Lifecycle-ordering bugs that must never be retried
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(self, Error::DoubleAcquisition(_) | Error::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_message_names_kind_and_attempts() {
        let err = Error::Acquisition {
            kind: BrowserKind::Firefox,
            attempts: 3,
            last_cause: "connection refused".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("firefox"));
        assert!(msg.contains("3 attempt"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_wait_kind_accessor() {
        let err = Error::wait_timeout(WaitKind::Clickability, "#login", Duration::from_secs(1));
        assert_eq!(err.wait_kind(), Some(WaitKind::Clickability));
        assert_eq!(Error::NotInitialized.wait_kind(), None);
    }

    #[test]
    fn test_lifecycle_violations() {
        assert!(Error::NotInitialized.is_lifecycle_violation());
        assert!(Error::DoubleAcquisition("abc".into()).is_lifecycle_violation());
        assert!(!Error::driver("boom").is_lifecycle_violation());
    }

    #[test]
    fn test_stale_element_is_distinct_from_driver_errors() {
        assert!(Error::stale_element("detached").is_stale_element());
        assert!(!Error::driver("stale element reference").is_stale_element());
    }
}
