//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use envcache::config::ConfigFileError;
use envcache::{DiscoveryError, PersistenceError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be loaded
    Config(ConfigFileError),
    /// Strategy settings were rejected
    Strategy(String),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Failed to install the Ctrl-C handler
    SignalHandler(String),
    /// Discovery failed
    Discovery(DiscoveryError),
    /// Snapshot store error
    Snapshots(PersistenceError),
    /// Failed to render output
    Output(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Config(ConfigFileError::InvalidValue { .. }) = self {
            eprintln!();
            eprintln!(
                "Check {} or run 'envcache config show' to see the effective settings.",
                envcache::config::config_file_path().display()
            );
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Strategy(msg) => write!(f, "Invalid discovery settings: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::SignalHandler(msg) => write!(f, "Failed to set signal handler: {}", msg),
            CliError::Discovery(e) => write!(f, "Discovery failed: {}", e),
            CliError::Snapshots(e) => write!(f, "Snapshot store error: {}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Discovery(e) => Some(e),
            CliError::Snapshots(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<DiscoveryError> for CliError {
    fn from(e: DiscoveryError) -> Self {
        CliError::Discovery(e)
    }
}

impl From<PersistenceError> for CliError {
    fn from(e: PersistenceError) -> Self {
        CliError::Snapshots(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_cause() {
        let err = CliError::from(DiscoveryError::scan("path", "denied"));
        assert_eq!(
            err.to_string(),
            "Discovery failed: Scan 'path' failed: denied"
        );
    }

    #[test]
    fn test_source_is_exposed() {
        use std::error::Error;

        let err = CliError::from(PersistenceError::Store("boom".to_string()));
        assert!(err.source().is_some());
        assert!(CliError::Strategy("x".to_string()).source().is_none());
    }
}
