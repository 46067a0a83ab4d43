//! Durable snapshots of scan results.
//!
//! A snapshot is the last successfully scanned runtime list for a partition.
//! It is written once per completed scan and read on a cold start so callers
//! get an immediate, possibly stale, answer while a fresh scan runs.
//!
//! # Architecture
//!
//! ```text
//! DiscoveryOrchestrator
//!        │ load_snapshot / save_snapshot
//!        ▼
//! SnapshotBridge ──► tags entries cache-derived on load, clears the tag on save
//!        │ create_partition(key, scope)
//!        ▼
//! SnapshotStore (MemorySnapshotStore, JsonFileSnapshotStore, ...)
//! ```
//!
//! Persistence is an optimization, not a source of truth: read failures are
//! reported as a miss and write failures never block returning fresh results.

mod json_file;
mod memory;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::key::CacheKey;
use crate::runtime::Runtime;
use crate::BoxFuture;

pub use json_file::{JsonFileSnapshotStore, SnapshotFileInfo};
pub use memory::MemorySnapshotStore;

/// Where a partition's snapshot lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SnapshotScope {
    /// Shared by every workspace.
    Global,
    /// Scoped to the current workspace.
    Workspace,
}

impl SnapshotScope {
    /// Scope matching a per-workspace caching flag.
    pub fn for_per_workspace(per_workspace: bool) -> Self {
        if per_workspace {
            Self::Workspace
        } else {
            Self::Global
        }
    }

    /// Lowercase name, used for directory names and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Workspace => "workspace",
        }
    }
}

impl fmt::Display for SnapshotScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One durable slot keyed by a cache key.
pub trait SnapshotPartition: Send + Sync {
    /// Read the stored list, `Ok(None)` if nothing was stored.
    fn read(&self) -> Result<Option<Vec<Runtime>>, PersistenceError>;

    /// Replace the stored list.
    fn write(&self, runtimes: Vec<Runtime>) -> BoxFuture<'_, Result<(), PersistenceError>>;
}

/// Factory for snapshot partitions.
pub trait SnapshotStore: Send + Sync {
    /// Open the partition for `key` in `scope`.
    fn create_partition(&self, key: &CacheKey, scope: SnapshotScope) -> Box<dyn SnapshotPartition>;
}

/// Orchestrator-facing view of a [`SnapshotStore`] with a fixed scope.
#[derive(Clone)]
pub struct SnapshotBridge {
    store: Arc<dyn SnapshotStore>,
    scope: SnapshotScope,
}

impl SnapshotBridge {
    /// Create a bridge writing to `store` in `scope`.
    pub fn new(store: Arc<dyn SnapshotStore>, scope: SnapshotScope) -> Self {
        Self { store, scope }
    }

    /// The scope fixed at construction.
    pub fn scope(&self) -> SnapshotScope {
        self.scope
    }

    /// Load the snapshot for `key`, every entry tagged as cache-derived.
    ///
    /// Read failures are logged and reported as a miss.
    pub fn load_snapshot(&self, key: &CacheKey) -> Option<Vec<Runtime>> {
        let partition = self.store.create_partition(key, self.scope);
        match partition.read() {
            Ok(Some(runtimes)) => {
                debug!(key = %key, count = runtimes.len(), "Loaded snapshot");
                Some(runtimes.iter().map(Runtime::as_cached).collect())
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read snapshot, treating as miss");
                None
            }
        }
    }

    /// Persist `runtimes` as the snapshot for `key`.
    ///
    /// Entries are written without the cache-derived tag.
    pub async fn save_snapshot(
        &self,
        key: &CacheKey,
        runtimes: &[Runtime],
    ) -> Result<(), PersistenceError> {
        let fresh = runtimes
            .iter()
            .map(|runtime| Runtime {
                cached_entry: false,
                ..runtime.clone()
            })
            .collect();

        let partition = self.store.create_partition(key, self.scope);
        partition.write(fresh).await?;
        debug!(key = %key, count = runtimes.len(), scope = %self.scope, "Saved snapshot");
        Ok(())
    }
}

impl fmt::Debug for SnapshotBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotBridge")
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge(store: &Arc<MemorySnapshotStore>, scope: SnapshotScope) -> SnapshotBridge {
        SnapshotBridge::new(Arc::clone(store) as Arc<dyn SnapshotStore>, scope)
    }

    #[test]
    fn test_scope_for_flag() {
        assert_eq!(SnapshotScope::for_per_workspace(true), SnapshotScope::Workspace);
        assert_eq!(SnapshotScope::for_per_workspace(false), SnapshotScope::Global);
        assert_eq!(SnapshotScope::Workspace.to_string(), "workspace");
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let store = Arc::new(MemorySnapshotStore::new());
        let bridge = bridge(&store, SnapshotScope::Global);
        assert!(bridge.load_snapshot(&CacheKey::new("k")).is_none());
    }

    #[tokio::test]
    async fn test_save_clears_and_load_sets_cached_flag() {
        let store = Arc::new(MemorySnapshotStore::new());
        let bridge = bridge(&store, SnapshotScope::Global);
        let key = CacheKey::new("k");

        bridge
            .save_snapshot(&key, &[Runtime::new("py").as_cached()])
            .await
            .unwrap();

        let stored = store.stored(&key, SnapshotScope::Global).unwrap();
        assert!(!stored[0].cached_entry);

        let loaded = bridge.load_snapshot(&key).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].cached_entry);
    }

    #[tokio::test]
    async fn test_scopes_are_separate() {
        let store = Arc::new(MemorySnapshotStore::new());
        let key = CacheKey::new("k");

        bridge(&store, SnapshotScope::Workspace)
            .save_snapshot(&key, &[Runtime::new("py")])
            .await
            .unwrap();

        assert!(bridge(&store, SnapshotScope::Global).load_snapshot(&key).is_none());
        assert!(bridge(&store, SnapshotScope::Workspace).load_snapshot(&key).is_some());
    }

    #[tokio::test]
    async fn test_read_failure_is_miss() {
        let store = Arc::new(MemorySnapshotStore::new());
        let bridge = bridge(&store, SnapshotScope::Global);
        let key = CacheKey::new("k");

        bridge.save_snapshot(&key, &[Runtime::new("py")]).await.unwrap();
        store.set_fail_reads(true);

        assert!(bridge.load_snapshot(&key).is_none());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let store = Arc::new(MemorySnapshotStore::new());
        let bridge = bridge(&store, SnapshotScope::Global);
        store.set_fail_writes(true);

        let result = bridge.save_snapshot(&CacheKey::new("k"), &[]).await;
        assert!(result.is_err());
    }
}
