//! Filesystem watcher backed by `notify`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::{CreateHandler, ManualWatcher, Subscription, WatchError, Watcher};

/// Forwards file creation events under a set of directories to subscribers.
///
/// Only `Create` events are forwarded; modifications and removals are ignored.
pub struct FsWatcher {
    dispatch: Arc<ManualWatcher>,
    paths: Vec<PathBuf>,
    _backend: Mutex<RecommendedWatcher>,
}

impl FsWatcher {
    /// Watch each of `paths` (non-recursively).
    ///
    /// Paths that do not exist are skipped; any other failure is an error.
    pub fn new<I, P>(paths: I) -> Result<Self, WatchError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let dispatch = Arc::new(ManualWatcher::new());

        let sink = Arc::clone(&dispatch);
        let mut backend =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if let EventKind::Create(_) = event.kind {
                        for path in &event.paths {
                            debug!(path = %path.display(), "File created");
                            sink.fire_created(path);
                        }
                    }
                }
                Err(e) => error!(error = %e, "Watch error"),
            })
            .map_err(|e| WatchError::Backend(e.to_string()))?;

        let mut watched = Vec::new();
        for path in paths.into_iter().map(Into::<PathBuf>::into) {
            if !path.is_dir() {
                debug!(path = %path.display(), "Skipping missing watch directory");
                continue;
            }
            backend
                .watch(&path, RecursiveMode::NonRecursive)
                .map_err(|e| WatchError::Path {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            info!(path = %path.display(), "Watching directory");
            watched.push(path);
        }

        Ok(Self {
            dispatch,
            paths: watched,
            _backend: Mutex::new(backend),
        })
    }

    /// Directories actually being watched.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.dispatch.subscriber_count()
    }

    /// Deliver a creation event as if the backend had reported it.
    pub fn notify_created(&self, path: &Path) -> usize {
        self.dispatch.fire_created(path)
    }
}

impl Watcher for FsWatcher {
    fn on_did_create(&self, handler: CreateHandler) -> Subscription {
        self.dispatch.on_did_create(handler)
    }
}

impl std::fmt::Debug for FsWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsWatcher")
            .field("paths", &self.paths)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_missing_directories_are_skipped() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        let watcher = FsWatcher::new([temp.path().to_path_buf(), missing]).unwrap();
        assert_eq!(watcher.paths(), [temp.path().to_path_buf()]);
    }

    #[test]
    fn test_notify_created_reaches_subscriber() {
        let temp = TempDir::new().unwrap();
        let watcher = FsWatcher::new([temp.path()]).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let _subscription = watcher.on_did_create(Arc::new(move |_path: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        watcher.notify_created(&temp.path().join("python3"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
