//! Configuration.
//!
//! [`DiscoveryConfig`] is the library-level configuration consumed by the
//! orchestrator builder. [`ConfigFile`] is the user-facing INI file
//! (`~/.envcache/config.ini`) that the CLI loads and turns into a
//! `DiscoveryConfig` plus strategy and store settings.

mod file;

pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, DiscoverySettings,
    LoggingSettings, StoreSettings, DEFAULT_LOG_FILE, DEFAULT_STRATEGY_NAME,
};

use crate::future_cache::CacheBackend;

/// Orchestrator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Name used in cache keys. Defaults to the strategy's own name.
    pub name: Option<String>,
    /// Partition the cache per workspace folder instead of globally.
    pub cache_per_workspace: bool,
    /// Which future-cache map to use.
    pub cache_backend: CacheBackend,
}

impl DiscoveryConfig {
    /// Create a configuration with defaults (global caching, isolated backend).
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the name used in cache keys.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enable or disable per-workspace caching.
    pub fn with_cache_per_workspace(mut self, per_workspace: bool) -> Self {
        self.cache_per_workspace = per_workspace;
        self
    }

    /// Select the future-cache backend.
    pub fn with_cache_backend(mut self, backend: CacheBackend) -> Self {
        self.cache_backend = backend;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiscoveryConfig::new();
        assert!(config.name.is_none());
        assert!(!config.cache_per_workspace);
        assert_eq!(config.cache_backend, CacheBackend::Isolated);
    }

    #[test]
    fn test_builder() {
        let config = DiscoveryConfig::new()
            .with_name("venv")
            .with_cache_per_workspace(true)
            .with_cache_backend(CacheBackend::Shared);
        assert_eq!(config.name.as_deref(), Some("venv"));
        assert!(config.cache_per_workspace);
        assert_eq!(config.cache_backend, CacheBackend::Shared);
    }
}
