//! Configuration file handling for ~/.envcache/config.ini.
//!
//! ```ini
//! [discovery]
//! name = path
//! cache_per_workspace = false
//! search_paths = /usr/bin, /usr/local/bin
//! patterns = python*, pypy*
//! workspace_dirs = .venv/bin, venv/bin
//!
//! [store]
//! directory = ~/.envcache/snapshots
//!
//! [logging]
//! directory = ~/.envcache/logs
//! file = envcache.log
//! ```
//!
//! Every key is optional. A missing file yields the defaults.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::DiscoveryConfig;

/// Default strategy name.
pub const DEFAULT_STRATEGY_NAME: &str = "path";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "envcache.log";

const DEFAULT_PATTERNS: &[&str] = &["python*"];
const DEFAULT_WORKSPACE_DIRS: &[&str] = &[".venv/bin", "venv/bin"];

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[discovery]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    /// Strategy name used in cache keys.
    pub name: String,
    /// Partition the cache per workspace folder.
    pub cache_per_workspace: bool,
    /// Absolute directories to scan. Empty means the entries of `$PATH`.
    pub search_paths: Vec<PathBuf>,
    /// File name glob patterns.
    pub patterns: Vec<String>,
    /// Directories relative to the workspace root.
    pub workspace_dirs: Vec<PathBuf>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_STRATEGY_NAME.to_string(),
            cache_per_workspace: false,
            search_paths: Vec::new(),
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            workspace_dirs: DEFAULT_WORKSPACE_DIRS.iter().map(PathBuf::from).collect(),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Snapshot directory.
    pub directory: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("snapshots"),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log directory.
    pub directory: PathBuf,
    /// Log file name inside `directory`.
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("logs"),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub discovery: DiscoverySettings,
    pub store: StoreSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.envcache/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Library configuration derived from the `[discovery]` section.
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig::new()
            .with_name(self.discovery.name.clone())
            .with_cache_per_workspace(self.discovery.cache_per_workspace)
    }

    /// Render the effective configuration as INI text.
    pub fn to_config_string(&self) -> String {
        let mut out = String::new();
        let d = &self.discovery;

        let _ = writeln!(out, "[discovery]");
        let _ = writeln!(out, "name = {}", d.name);
        let _ = writeln!(out, "cache_per_workspace = {}", d.cache_per_workspace);
        let _ = writeln!(out, "search_paths = {}", join_paths(&d.search_paths));
        let _ = writeln!(out, "patterns = {}", d.patterns.join(", "));
        let _ = writeln!(out, "workspace_dirs = {}", join_paths(&d.workspace_dirs));
        let _ = writeln!(out);
        let _ = writeln!(out, "[store]");
        let _ = writeln!(out, "directory = {}", self.store.directory.display());
        let _ = writeln!(out);
        let _ = writeln!(out, "[logging]");
        let _ = writeln!(out, "directory = {}", self.logging.directory.display());
        let _ = writeln!(out, "file = {}", self.logging.file);

        out
    }
}

/// Get the path to the config directory (~/.envcache).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".envcache")
}

/// Get the path to the config file (~/.envcache/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Overlay any values found in `ini` on the defaults.
fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [discovery] section
    if let Some(section) = ini.section(Some("discovery")) {
        if let Some(v) = section.get("name") {
            let v = v.trim();
            if v.is_empty() || v.contains(':') {
                return Err(ConfigFileError::InvalidValue {
                    section: "discovery".to_string(),
                    key: "name".to_string(),
                    value: v.to_string(),
                    reason: "must be non-empty and must not contain ':'".to_string(),
                });
            }
            config.discovery.name = v.to_string();
        }
        if let Some(v) = section.get("cache_per_workspace") {
            config.discovery.cache_per_workspace =
                parse_bool(v).ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "discovery".to_string(),
                    key: "cache_per_workspace".to_string(),
                    value: v.to_string(),
                    reason: "expected true or false".to_string(),
                })?;
        }
        if let Some(v) = section.get("search_paths") {
            config.discovery.search_paths = split_list(v).map(expand_tilde).collect();
        }
        if let Some(v) = section.get("patterns") {
            let patterns: Vec<String> = split_list(v).map(str::to_string).collect();
            if let Some(bad) = patterns.iter().find(|p| glob::Pattern::new(p).is_err()) {
                return Err(ConfigFileError::InvalidValue {
                    section: "discovery".to_string(),
                    key: "patterns".to_string(),
                    value: bad.clone(),
                    reason: "not a valid glob pattern".to_string(),
                });
            }
            if !patterns.is_empty() {
                config.discovery.patterns = patterns;
            }
        }
        if let Some(v) = section.get("workspace_dirs") {
            config.discovery.workspace_dirs = split_list(v).map(PathBuf::from).collect();
        }
    }

    // [store] section
    if let Some(section) = ini.section(Some("store")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.store.directory = expand_tilde(v);
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Expand ~ to home directory in paths.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(text: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(text).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.discovery.name, "path");
        assert!(!config.discovery.cache_per_workspace);
        assert!(config.discovery.search_paths.is_empty());
        assert_eq!(config.discovery.patterns, vec!["python*"]);
        assert_eq!(config.logging.file, DEFAULT_LOG_FILE);
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(
            &path,
            "[discovery]\nname = venv\ncache_per_workspace = yes\n\n[store]\ndirectory = /var/envcache\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.discovery.name, "venv");
        assert!(config.discovery.cache_per_workspace);
        assert_eq!(config.store.directory, PathBuf::from("/var/envcache"));
    }

    #[test]
    fn test_lists_are_comma_separated() {
        let config = parse(
            "[discovery]\nsearch_paths = /usr/bin, /opt/bin,\npatterns = python3*, pypy*\nworkspace_dirs = env/bin\n",
        )
        .unwrap();
        assert_eq!(
            config.discovery.search_paths,
            vec![PathBuf::from("/usr/bin"), PathBuf::from("/opt/bin")]
        );
        assert_eq!(config.discovery.patterns, vec!["python3*", "pypy*"]);
        assert_eq!(config.discovery.workspace_dirs, vec![PathBuf::from("env/bin")]);
    }

    #[test]
    fn test_invalid_bool() {
        let err = parse("[discovery]\ncache_per_workspace = maybe\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "discovery");
                assert_eq!(key, "cache_per_workspace");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_name_with_separator_rejected() {
        assert!(parse("[discovery]\nname = a:b\n").is_err());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(parse("[discovery]\npatterns = [py\n").is_err());
    }

    #[test]
    fn test_discovery_config_conversion() {
        let config = parse("[discovery]\nname = venv\ncache_per_workspace = true\n").unwrap();
        let discovery = config.discovery_config();
        assert_eq!(discovery.name.as_deref(), Some("venv"));
        assert!(discovery.cache_per_workspace);
    }

    #[test]
    fn test_config_string_reparses() {
        let mut config = ConfigFile::default();
        config.discovery.name = "venv".to_string();
        config.discovery.search_paths = vec![PathBuf::from("/usr/bin")];

        let reparsed = parse(&config.to_config_string()).unwrap();
        assert_eq!(reparsed.discovery, config.discovery);
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs"), PathBuf::from("/abs"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x"), home.join("x"));
        }
    }
}
