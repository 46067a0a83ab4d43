//! Runtime descriptors.
//!
//! The caching core treats a [`Runtime`] as an inert record. It only looks at
//! how many were found and flips [`Runtime::cached_entry`] when a record is
//! served from a persisted snapshot instead of a fresh scan.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A discovered language runtime (interpreter, virtual environment, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runtime {
    /// Stable identifier, unique within one scan result.
    pub id: String,

    /// Path to the runtime executable, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    /// Reported version string, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Free-form attributes supplied by the scan strategy.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    /// Whether this record came from a persisted snapshot.
    #[serde(default)]
    pub cached_entry: bool,
}

impl Runtime {
    /// Create a runtime with only an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            executable: None,
            version: None,
            attributes: BTreeMap::new(),
            cached_entry: false,
        }
    }

    /// Set the executable path.
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    /// Set the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add a free-form attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Return a copy tagged as served from a snapshot.
    pub fn as_cached(&self) -> Self {
        Self {
            cached_entry: true,
            ..self.clone()
        }
    }
}
