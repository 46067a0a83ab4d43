//! Error types for runtime discovery.
//!
//! [`DiscoveryError`] is delivered to every caller awaiting the same
//! in-flight scan, so it is `Clone` and carries messages rather than source
//! errors. [`PersistenceError`] covers the durable snapshot store.

use thiserror::Error;

/// Errors surfaced by [`request_discovery`](crate::DiscoveryOrchestrator::request_discovery).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The scan strategy failed.
    #[error("Scan '{strategy}' failed: {message}")]
    Scan {
        /// Name of the strategy that failed.
        strategy: String,
        /// Failure description from the strategy.
        message: String,
    },

    /// The scan task ended without settling its result.
    #[error("Scan '{0}' was abandoned before completing")]
    Abandoned(String),

    /// No async runtime was available to run the scan.
    #[error("Failed to spawn scan task: {0}")]
    SpawnError(String),
}

impl DiscoveryError {
    /// Create a scan failure for the given strategy.
    pub fn scan(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scan {
            strategy: strategy.into(),
            message: message.into(),
        }
    }
}

/// Errors from the durable snapshot store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// I/O error reading or writing a snapshot.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot bytes could not be encoded or decoded.
    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Store-specific failure.
    #[error("Store error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_display() {
        let err = DiscoveryError::scan("path", "permission denied");
        let text = err.to_string();
        assert!(text.contains("path"));
        assert!(text.contains("permission denied"));
    }

    #[test]
    fn test_discovery_error_clone_eq() {
        let err = DiscoveryError::Abandoned("conda".to_string());
        assert_eq!(err.clone(), err);
    }

    #[test]
    fn test_persistence_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PersistenceError = io_err.into();
        assert!(matches!(err, PersistenceError::Io(_)));
    }
}
