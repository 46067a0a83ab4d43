//! The discovery orchestrator.
//!
//! Wraps one [`ScanStrategy`] with request deduplication, snapshot fallback
//! and watcher-driven invalidation.
//!
//! # Request flow
//!
//! ```text
//! request_discovery(hint, options)
//!     │
//!     ├─► CacheKeyPolicy::key_for(hint) ──► CacheKey
//!     │
//!     ├─► FutureCache::reuse_or_start(key, ignore_cache)
//!     │       ├─ Reused  ─► await the same PendingResult
//!     │       └─ Started ─► spawn scan task ─► save snapshot ─► resolve
//!     │                     publish on "discovery started"
//!     │
//!     ├─► WatcherRegistry::try_claim(key) ─► subscribe strategy watchers once
//!     │
//!     └─► return: settled outcome
//!                 │ else persisted snapshot (tagged cached), scan continues
//!                 └ else await the live scan
//! ```
//!
//! Scans are never cancelled or retried. A forced refresh supersedes the
//! cached entry; holders of the superseded result still see it settle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::events::{DiscoveryStartedReceiver, StartedEvents};
use super::signal::HasRuntimesSignal;
use super::types::DiscoveryOptions;
use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;
use crate::future_cache::{CacheBackend, CacheLookup, FutureCache};
use crate::key::{CacheKey, CacheKeyPolicy};
use crate::pending::{DiscoveryResult, PendingResult};
use crate::persistence::{MemorySnapshotStore, SnapshotBridge, SnapshotScope, SnapshotStore};
use crate::runtime::Runtime;
use crate::strategy::ScanStrategy;
use crate::telemetry::{
    DiscoveryMetrics, DiscoveryMetricsSnapshot, DiscoveryTelemetry, TelemetrySink,
    TracingTelemetry,
};
use crate::watcher::{CreateHandler, DisposableRegistry, Subscription, WatcherRegistry};
use crate::workspace::{NoWorkspace, WorkspaceResolver};

struct Inner {
    name: String,
    strategy: Arc<dyn ScanStrategy>,
    keys: CacheKeyPolicy,
    cache: FutureCache,
    snapshots: SnapshotBridge,
    watchers: WatcherRegistry,
    disposables: Arc<DisposableRegistry>,
    telemetry: Arc<dyn TelemetrySink>,
    metrics: DiscoveryMetrics,
    signal: HasRuntimesSignal,
    started: StartedEvents,
    suggestions_triggered: AtomicBool,
}

/// Caching front for one scan strategy.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct DiscoveryOrchestrator {
    inner: Arc<Inner>,
}

impl DiscoveryOrchestrator {
    /// Start building an orchestrator around `strategy`.
    pub fn builder(strategy: Arc<dyn ScanStrategy>) -> DiscoveryOrchestratorBuilder {
        DiscoveryOrchestratorBuilder::new(strategy)
    }

    /// Name used in cache keys, logs and telemetry.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The future-cache backend in use.
    pub fn cache_backend(&self) -> CacheBackend {
        self.inner.cache.backend()
    }

    /// The snapshot scope in use.
    pub fn snapshot_scope(&self) -> SnapshotScope {
        self.inner.snapshots.scope()
    }

    /// The cache key for a partition hint.
    pub fn cache_key(&self, hint: Option<&Path>) -> CacheKey {
        self.inner.keys.key_for(hint)
    }

    /// The cached result for `hint`, if any.
    pub fn cached(&self, hint: Option<&Path>) -> Option<PendingResult> {
        self.inner.cache.get(&self.cache_key(hint))
    }

    /// Discover runtimes for `hint`.
    ///
    /// Concurrent calls for the same partition share one scan. On a cold
    /// in-process cache a persisted snapshot is returned immediately (tagged
    /// [`cached_entry`](Runtime::cached_entry)) while the scan continues in
    /// the background; failures of that background scan are not reported to
    /// this caller.
    pub async fn request_discovery(
        &self,
        hint: Option<&Path>,
        options: DiscoveryOptions,
    ) -> Result<Vec<Runtime>, DiscoveryError> {
        let handle = Handle::try_current().map_err(|e| DiscoveryError::SpawnError(e.to_string()))?;
        let inner = &self.inner;
        let key = inner.keys.key_for(hint);
        inner.metrics.request_received();

        let lookup = inner.cache.reuse_or_start(&key, options.ignore_cache);

        self.attach_watchers(&handle, &key, hint);

        let pending = match lookup {
            CacheLookup::Reused(pending) => {
                inner.metrics.request_reused();
                debug!(key = %key, pending = pending.id(), settled = pending.is_settled(), "Reusing cached discovery");
                self.track_signal(&handle, &pending);
                pending
            }
            CacheLookup::Started(pending) => {
                debug!(key = %key, pending = pending.id(), forced = options.ignore_cache, "Starting discovery");
                self.spawn_scan(&handle, key.clone(), hint.map(Path::to_path_buf), pending.clone());
                inner.started.publish(&pending);
                pending
            }
        };

        if let Some(outcome) = pending.peek() {
            return outcome;
        }

        if !options.ignore_cache {
            if let Some(snapshot) = inner.snapshots.load_snapshot(&key) {
                inner.metrics.snapshot_served();
                debug!(key = %key, count = snapshot.len(), "Serving persisted snapshot while scan runs");
                return Ok(snapshot);
            }
        }

        pending.wait().await
    }

    /// Subscribe to new scans. Fires once per scan start, never for reuse.
    ///
    /// Events queue per subscriber until read; none are dropped.
    pub fn subscribe_discovery_started(&self) -> DiscoveryStartedReceiver {
        self.inner.started.subscribe()
    }

    /// Whether any settled scan found at least one runtime.
    ///
    /// `false` until the first scan settles.
    pub fn has_any_runtimes(&self) -> bool {
        self.inner.signal.get()
    }

    /// Wait for the first settled scan, then return [`has_any_runtimes`](Self::has_any_runtimes).
    pub async fn wait_for_first_outcome(&self) -> bool {
        self.inner.signal.wait_for_first_outcome().await
    }

    /// Whether runtime suggestions were already triggered.
    pub fn did_trigger_runtime_suggestions(&self) -> bool {
        self.inner.suggestions_triggered.load(Ordering::SeqCst)
    }

    /// Record whether runtime suggestions were triggered.
    pub fn set_did_trigger_runtime_suggestions(&self, triggered: bool) {
        self.inner
            .suggestions_triggered
            .store(triggered, Ordering::SeqCst);
    }

    /// Counters for this orchestrator.
    pub fn metrics(&self) -> DiscoveryMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Release every watcher subscription.
    ///
    /// Cached results stay usable; watchers are not re-attached for keys
    /// that were already claimed.
    pub fn dispose(&self) {
        self.inner.disposables.dispose_all();
    }

    fn spawn_scan(
        &self,
        handle: &Handle,
        key: CacheKey,
        hint: Option<PathBuf>,
        pending: PendingResult,
    ) {
        let inner = Arc::clone(&self.inner);
        inner.metrics.scan_started();

        handle.spawn(async move {
            let _guard = pending.abandon_guard(inner.name.clone());
            let started = Instant::now();
            let outcome = inner.strategy.scan(hint).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(runtimes) => {
                    let count = runtimes.len();
                    info!(
                        strategy = %inner.name,
                        key = %key,
                        count,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Discovery complete"
                    );
                    debug!(
                        key = %key,
                        ids = ?runtimes.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
                        "Discovered runtimes"
                    );

                    if let Err(e) = inner.snapshots.save_snapshot(&key, &runtimes).await {
                        warn!(key = %key, error = %e, "Failed to persist snapshot");
                    }

                    // Bookkeeping first so awaiters observe it once resolved.
                    inner
                        .telemetry
                        .record(DiscoveryTelemetry::success(&inner.name, elapsed, count));
                    inner.metrics.scan_settled(true, elapsed);
                    inner.signal.observe(count > 0);
                    pending.resolve(runtimes);
                }
                Err(e) => {
                    warn!(strategy = %inner.name, key = %key, error = %e, "Discovery failed");
                    inner.telemetry.record(DiscoveryTelemetry::failure(
                        &inner.name,
                        elapsed,
                        e.to_string(),
                    ));
                    inner.metrics.scan_settled(false, elapsed);
                    inner.signal.observe(false);
                    pending.reject(e);
                }
            }
        });
    }

    /// Feed the outcome of a reused result into the signal.
    ///
    /// With the shared backend the result may come from another orchestrator,
    /// whose scan task only updates its own signal.
    fn track_signal(&self, handle: &Handle, pending: &PendingResult) {
        if let Some(outcome) = pending.peek() {
            observe_outcome(&self.inner.signal, &outcome);
            return;
        }
        let signal = self.inner.signal.clone();
        let pending = pending.clone();
        handle.spawn(async move {
            let outcome = pending.wait().await;
            observe_outcome(&signal, &outcome);
        });
    }

    fn attach_watchers(&self, handle: &Handle, key: &CacheKey, hint: Option<&Path>) {
        let inner = &self.inner;
        if !inner.watchers.try_claim(key) {
            return;
        }

        let watchers = inner.strategy.watchers(hint);
        debug!(key = %key, count = watchers.len(), "Attaching watchers");

        for watcher in watchers {
            let handler = invalidation_handler(
                Arc::downgrade(&self.inner),
                handle.clone(),
                key.clone(),
                hint.map(Path::to_path_buf),
            );
            let mut subscription = watcher.on_did_create(handler);
            // The subscription keeps the watcher alive until disposal.
            inner.disposables.push(Subscription::new(move || {
                subscription.dispose();
                drop(watcher);
            }));
        }
    }
}

/// Handler that evicts `key` and re-requests discovery in the background.
fn invalidation_handler(
    inner: Weak<Inner>,
    handle: Handle,
    key: CacheKey,
    hint: Option<PathBuf>,
) -> CreateHandler {
    Arc::new(move |path: &Path| {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        debug!(key = %key, path = %path.display(), "Runtime location changed, invalidating");
        inner.cache.delete(&key);
        inner.metrics.invalidated();

        let orchestrator = DiscoveryOrchestrator { inner };
        let hint = hint.clone();
        handle.spawn(async move {
            if let Err(e) = orchestrator
                .request_discovery(hint.as_deref(), DiscoveryOptions::default())
                .await
            {
                debug!(error = %e, "Background rediscovery failed");
            }
        });
    })
}

fn observe_outcome(signal: &HasRuntimesSignal, outcome: &DiscoveryResult) {
    match outcome {
        Ok(runtimes) => signal.observe(!runtimes.is_empty()),
        Err(_) => signal.observe(false),
    };
}

impl std::fmt::Debug for DiscoveryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryOrchestrator")
            .field("name", &self.inner.name)
            .field("keys", &self.inner.keys)
            .field("cache", &self.inner.cache)
            .field("snapshots", &self.inner.snapshots)
            .field("has_any_runtimes", &self.inner.signal.get())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`DiscoveryOrchestrator`].
///
/// Only the strategy is required. Defaults: [`DiscoveryConfig::default`],
/// an in-process [`MemorySnapshotStore`], [`NoWorkspace`],
/// [`TracingTelemetry`] and a private [`DisposableRegistry`].
pub struct DiscoveryOrchestratorBuilder {
    strategy: Arc<dyn ScanStrategy>,
    config: DiscoveryConfig,
    store: Option<Arc<dyn SnapshotStore>>,
    resolver: Option<Arc<dyn WorkspaceResolver>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    disposables: Option<Arc<DisposableRegistry>>,
}

impl DiscoveryOrchestratorBuilder {
    /// Start a builder for `strategy`.
    pub fn new(strategy: Arc<dyn ScanStrategy>) -> Self {
        Self {
            strategy,
            config: DiscoveryConfig::default(),
            store: None,
            resolver: None,
            telemetry: None,
            disposables: None,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the snapshot store.
    pub fn store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the workspace resolver used for per-workspace keys.
    pub fn resolver(mut self, resolver: Arc<dyn WorkspaceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set the telemetry sink.
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Register watcher subscriptions in an external registry.
    pub fn disposables(mut self, disposables: Arc<DisposableRegistry>) -> Self {
        self.disposables = Some(disposables);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> DiscoveryOrchestrator {
        let name = self
            .config
            .name
            .clone()
            .unwrap_or_else(|| self.strategy.name().to_string());
        let per_workspace = self.config.cache_per_workspace;

        let resolver = self.resolver.unwrap_or_else(|| Arc::new(NoWorkspace));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySnapshotStore::new()));

        let inner = Inner {
            keys: CacheKeyPolicy::new(&name, per_workspace, resolver),
            cache: FutureCache::new(self.config.cache_backend),
            snapshots: SnapshotBridge::new(store, SnapshotScope::for_per_workspace(per_workspace)),
            watchers: WatcherRegistry::new(),
            disposables: self
                .disposables
                .unwrap_or_else(|| Arc::new(DisposableRegistry::new())),
            telemetry: self
                .telemetry
                .unwrap_or_else(|| Arc::new(TracingTelemetry)),
            metrics: DiscoveryMetrics::new(),
            signal: HasRuntimesSignal::new(),
            started: StartedEvents::new(),
            suggestions_triggered: AtomicBool::new(false),
            strategy: self.strategy,
            name,
        };

        debug!(name = %inner.name, per_workspace, backend = ?inner.cache.backend(), "Created discovery orchestrator");

        DiscoveryOrchestrator {
            inner: Arc::new(inner),
        }
    }
}
