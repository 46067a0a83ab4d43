//! Keyed store of in-flight and completed scan results.
//!
//! The [`FutureCache`] maps a [`CacheKey`] to the [`PendingResult`] of the
//! most recent scan for that partition. It is the deduplication point: a
//! request that finds a pending entry awaits it instead of scanning again.
//!
//! # Backends
//!
//! ```text
//! CacheBackend::Isolated ──► one map per FutureCache (production default)
//! CacheBackend::Shared   ──► one process-wide map shared by every cache
//! ```
//!
//! The shared map lets a test harness reuse scan results across short-lived
//! orchestrators. [`FutureCache::force_shared`] makes every cache created
//! afterwards use it regardless of the requested backend.
//!
//! Entries are never expired; they live until [`FutureCache::delete`] or a
//! replacement via [`FutureCache::set`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::key::CacheKey;
use crate::pending::PendingResult;

type EntryMap = DashMap<CacheKey, PendingResult>;

static SHARED_ENTRIES: OnceLock<Arc<EntryMap>> = OnceLock::new();
static FORCE_SHARED: AtomicBool = AtomicBool::new(false);

fn shared_entries() -> Arc<EntryMap> {
    Arc::clone(SHARED_ENTRIES.get_or_init(|| Arc::new(DashMap::new())))
}

/// Which map a [`FutureCache`] stores its entries in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    /// A map owned by this cache instance.
    #[default]
    Isolated,
    /// The process-wide map shared by all caches using this backend.
    Shared,
}

/// Result of [`FutureCache::reuse_or_start`].
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// An existing entry was found and should be awaited.
    Reused(PendingResult),
    /// A fresh entry was stored; the caller must start the scan that settles it.
    Started(PendingResult),
}

impl CacheLookup {
    /// The pending result, either reused or freshly started.
    pub fn pending(&self) -> &PendingResult {
        match self {
            Self::Reused(pending) | Self::Started(pending) => pending,
        }
    }

    /// Whether the caller must start a new scan.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

/// Map from cache key to the latest scan result for that key.
pub struct FutureCache {
    backend: CacheBackend,
    entries: Arc<EntryMap>,
}

impl FutureCache {
    /// Create a cache on the given backend.
    ///
    /// If [`force_shared`](Self::force_shared) is in effect the shared
    /// backend is used regardless of `backend`.
    pub fn new(backend: CacheBackend) -> Self {
        let backend = if FORCE_SHARED.load(Ordering::SeqCst) {
            CacheBackend::Shared
        } else {
            backend
        };

        let entries = match backend {
            CacheBackend::Isolated => Arc::new(DashMap::new()),
            CacheBackend::Shared => shared_entries(),
        };

        Self { backend, entries }
    }

    /// Make every cache created from now on use the shared backend.
    ///
    /// Test harness switch; production code selects a backend explicitly.
    pub fn force_shared() {
        FORCE_SHARED.store(true, Ordering::SeqCst);
    }

    /// Undo [`force_shared`](Self::force_shared) for caches created from now on.
    pub fn force_isolated() {
        FORCE_SHARED.store(false, Ordering::SeqCst);
    }

    /// Drop every entry in the process-wide shared map.
    pub fn clear_shared() {
        if let Some(entries) = SHARED_ENTRIES.get() {
            entries.clear();
        }
    }

    /// The backend this cache ended up on.
    pub fn backend(&self) -> CacheBackend {
        self.backend
    }

    /// Look up the entry for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<PendingResult> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store `value` under `key`, returning the entry it replaced.
    pub fn set(&self, key: CacheKey, value: PendingResult) -> Option<PendingResult> {
        self.entries.insert(key, value)
    }

    /// Remove the entry for `key`, returning it.
    pub fn delete(&self, key: &CacheKey) -> Option<PendingResult> {
        self.entries.remove(key).map(|(_, pending)| pending)
    }

    /// Atomically reuse the entry for `key`, or store a fresh one.
    ///
    /// With `force` set a fresh entry always replaces the existing one. The
    /// replaced entry is not cancelled; holders of it still see it settle.
    pub fn reuse_or_start(&self, key: &CacheKey, force: bool) -> CacheLookup {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if !force {
                    return CacheLookup::Reused(entry.get().clone());
                }
                let pending = PendingResult::new();
                let superseded = entry.insert(pending.clone());
                debug!(
                    key = %key,
                    superseded = superseded.id(),
                    pending = pending.id(),
                    "Superseding cached scan"
                );
                CacheLookup::Started(pending)
            }
            Entry::Vacant(entry) => {
                let pending = PendingResult::new();
                entry.insert(pending.clone());
                CacheLookup::Started(pending)
            }
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for FutureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FutureCache")
            .field("backend", &self.backend)
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    fn key(name: &str) -> CacheKey {
        CacheKey::new(format!("future_cache_tests_{}", name))
    }

    #[test]
    fn test_get_set_delete() {
        let cache = FutureCache::new(CacheBackend::Isolated);
        let k = key("basic");

        assert!(cache.get(&k).is_none());

        let pending = PendingResult::new();
        assert!(cache.set(k.clone(), pending.clone()).is_none());
        assert!(cache.get(&k).unwrap().ptr_eq(&pending));
        assert_eq!(cache.len(), 1);

        let removed = cache.delete(&k).unwrap();
        assert!(removed.ptr_eq(&pending));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_replaces_entry() {
        let cache = FutureCache::new(CacheBackend::Isolated);
        let k = key("replace");

        let first = PendingResult::new();
        let second = PendingResult::new();
        cache.set(k.clone(), first.clone());

        let replaced = cache.set(k.clone(), second.clone()).unwrap();
        assert!(replaced.ptr_eq(&first));
        assert!(cache.get(&k).unwrap().ptr_eq(&second));
    }

    #[test]
    fn test_isolated_instances_do_not_share() {
        let a = FutureCache::new(CacheBackend::Isolated);
        let b = FutureCache::new(CacheBackend::Isolated);
        let k = key("isolated");

        a.set(k.clone(), PendingResult::new());
        assert!(b.get(&k).is_none());
    }

    #[test]
    fn test_shared_instances_share() {
        let a = FutureCache::new(CacheBackend::Shared);
        let b = FutureCache::new(CacheBackend::Shared);
        let k = key("shared");

        let pending = PendingResult::new();
        a.set(k.clone(), pending.clone());
        assert!(b.get(&k).unwrap().ptr_eq(&pending));

        b.delete(&k);
        assert!(a.get(&k).is_none());
    }

    #[test]
    fn test_reuse_or_start_reuses() {
        let cache = FutureCache::new(CacheBackend::Isolated);
        let k = key("reuse");

        let first = cache.reuse_or_start(&k, false);
        assert!(first.is_started());

        let second = cache.reuse_or_start(&k, false);
        assert!(!second.is_started());
        assert!(second.pending().ptr_eq(first.pending()));
    }

    #[test]
    fn test_reuse_or_start_force_supersedes() {
        let cache = FutureCache::new(CacheBackend::Isolated);
        let k = key("force");

        let first = cache.reuse_or_start(&k, false);
        let forced = cache.reuse_or_start(&k, true);

        assert!(forced.is_started());
        assert!(!forced.pending().ptr_eq(first.pending()));
        assert!(cache.get(&k).unwrap().ptr_eq(forced.pending()));

        // The superseded result can still settle for whoever holds it
        first.pending().resolve(vec![Runtime::new("old")]);
        assert!(first.pending().is_settled());
        assert!(!forced.pending().is_settled());
    }
}
