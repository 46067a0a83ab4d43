//! In-process snapshot store.
//!
//! Survives orchestrator instances but not the process. Tests use it to
//! simulate restarts: drop the orchestrator, keep the store, build a new one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::{SnapshotPartition, SnapshotScope, SnapshotStore};
use crate::error::PersistenceError;
use crate::key::CacheKey;
use crate::runtime::Runtime;
use crate::BoxFuture;

type SlotMap = DashMap<(SnapshotScope, CacheKey), Vec<Runtime>>;

#[derive(Default)]
struct Shared {
    slots: SlotMap,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

/// Snapshot store backed by a concurrent map.
#[derive(Default, Clone)]
pub struct MemorySnapshotStore {
    shared: Arc<Shared>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The list stored for `key` in `scope`, as written.
    pub fn stored(&self, key: &CacheKey, scope: SnapshotScope) -> Option<Vec<Runtime>> {
        self.shared
            .slots
            .get(&(scope, key.clone()))
            .map(|slot| slot.value().clone())
    }

    /// Seed a snapshot directly.
    pub fn insert(&self, key: CacheKey, scope: SnapshotScope, runtimes: Vec<Runtime>) {
        self.shared.slots.insert((scope, key), runtimes);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.shared.writes.load(Ordering::SeqCst)
    }

    /// Make every read fail until reset.
    pub fn set_fail_reads(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn create_partition(&self, key: &CacheKey, scope: SnapshotScope) -> Box<dyn SnapshotPartition> {
        Box::new(MemoryPartition {
            shared: Arc::clone(&self.shared),
            slot: (scope, key.clone()),
        })
    }
}

impl std::fmt::Debug for MemorySnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySnapshotStore")
            .field("slots", &self.shared.slots.len())
            .finish()
    }
}

struct MemoryPartition {
    shared: Arc<Shared>,
    slot: (SnapshotScope, CacheKey),
}

impl SnapshotPartition for MemoryPartition {
    fn read(&self) -> Result<Option<Vec<Runtime>>, PersistenceError> {
        if self.shared.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistenceError::Store("injected read failure".to_string()));
        }
        Ok(self
            .shared
            .slots
            .get(&self.slot)
            .map(|slot| slot.value().clone()))
    }

    fn write(&self, runtimes: Vec<Runtime>) -> BoxFuture<'_, Result<(), PersistenceError>> {
        Box::pin(async move {
            if self.shared.fail_writes.load(Ordering::SeqCst) {
                return Err(PersistenceError::Store("injected write failure".to_string()));
            }
            self.shared.slots.insert(self.slot.clone(), runtimes);
            self.shared.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_partition_round_trip() {
        let store = MemorySnapshotStore::new();
        let key = CacheKey::new("k");
        let partition = store.create_partition(&key, SnapshotScope::Global);

        assert!(partition.read().unwrap().is_none());
        partition.write(vec![Runtime::new("a")]).await.unwrap();

        assert_eq!(partition.read().unwrap(), Some(vec![Runtime::new("a")]));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_slots() {
        let store = MemorySnapshotStore::new();
        let clone = store.clone();
        let key = CacheKey::new("k");

        store.insert(key.clone(), SnapshotScope::Global, vec![Runtime::new("a")]);
        assert!(clone.stored(&key, SnapshotScope::Global).is_some());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemorySnapshotStore::new();
        let partition = store.create_partition(&CacheKey::new("k"), SnapshotScope::Global);

        store.set_fail_reads(true);
        assert!(partition.read().is_err());

        store.set_fail_writes(true);
        assert!(partition.write(Vec::new()).await.is_err());
        assert_eq!(store.write_count(), 0);
    }
}
