//! Watcher driven by explicit notifications.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{CreateHandler, Subscription, Watcher};

type HandlerMap = HashMap<u64, CreateHandler>;

/// Watcher whose "created" notifications are fired by calling
/// [`fire_created`](ManualWatcher::fire_created).
///
/// Useful for integrating external change sources (editor events, registry
/// hooks) and for tests.
#[derive(Default)]
pub struct ManualWatcher {
    handlers: Arc<Mutex<HandlerMap>>,
    next_id: AtomicU64,
}

impl ManualWatcher {
    /// Create a watcher with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every subscriber that `path` was created.
    ///
    /// Returns the number of handlers invoked.
    pub fn fire_created(&self, path: &Path) -> usize {
        // Snapshot handlers so callbacks may (un)subscribe without deadlocking
        let handlers: Vec<CreateHandler> = self.handlers.lock().values().cloned().collect();
        for handler in &handlers {
            handler(path);
        }
        handlers.len()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

impl Watcher for ManualWatcher {
    fn on_did_create(&self, handler: CreateHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.lock().insert(id, handler);

        let handlers = Arc::clone(&self.handlers);
        Subscription::new(move || {
            handlers.lock().remove(&id);
        })
    }
}

impl std::fmt::Debug for ManualWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualWatcher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_fire_reaches_subscribers() {
        let watcher = ManualWatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let _subscription = watcher.on_did_create(Arc::new(move |_path: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(watcher.fire_created(Path::new("/bin/python3")), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispose_unsubscribes() {
        let watcher = ManualWatcher::new();
        let mut subscription = watcher.on_did_create(Arc::new(|_path: &Path| {}));
        assert_eq!(watcher.subscriber_count(), 1);

        subscription.dispose();
        assert_eq!(watcher.subscriber_count(), 0);
        assert_eq!(watcher.fire_created(Path::new("/x")), 0);
    }

    #[test]
    fn test_handler_receives_path() {
        let watcher = ManualWatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _subscription = watcher.on_did_create(Arc::new(move |path: &Path| {
            sink.lock().push(path.to_path_buf());
        }));

        watcher.fire_created(Path::new("/venv/bin/python"));
        assert_eq!(*seen.lock(), vec![std::path::PathBuf::from("/venv/bin/python")]);
    }
}
