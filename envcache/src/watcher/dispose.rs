//! Subscriptions and the registry that releases them.

use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

/// Handle to a registered watcher callback.
///
/// Disposing (or dropping) the subscription unregisters the callback.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription that runs `release` once when disposed.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Release the callback now. Later calls do nothing.
    pub fn dispose(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether the subscription has been released.
    pub fn is_disposed(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Collection of subscriptions released together on shutdown.
#[derive(Default)]
pub struct DisposableRegistry {
    items: Mutex<Vec<Subscription>>,
}

impl DisposableRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a subscription until [`dispose_all`](Self::dispose_all).
    pub fn push(&self, subscription: Subscription) {
        self.items.lock().push(subscription);
    }

    /// Number of held subscriptions.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the registry holds nothing.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Release every held subscription.
    pub fn dispose_all(&self) {
        // Take the list first so release callbacks run without the lock held
        let items = std::mem::take(&mut *self.items.lock());
        let count = items.len();
        for mut item in items {
            item.dispose();
        }
        debug!(count, "Disposed subscriptions");
    }
}

impl fmt::Debug for DisposableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableRegistry")
            .field("items", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_subscription(counter: &Arc<AtomicUsize>) -> Subscription {
        let counter = Arc::clone(counter);
        Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispose_runs_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut subscription = counting_subscription(&released);

        subscription.dispose();
        subscription.dispose();
        drop(subscription);

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let released = Arc::new(AtomicUsize::new(0));
        drop(counting_subscription(&released));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registry_dispose_all() {
        let released = Arc::new(AtomicUsize::new(0));
        let registry = DisposableRegistry::new();

        registry.push(counting_subscription(&released));
        registry.push(counting_subscription(&released));
        registry.push(Subscription::empty());
        assert_eq!(registry.len(), 3);

        registry.dispose_all();
        assert_eq!(released.load(Ordering::SeqCst), 2);
        assert!(registry.is_empty());
    }
}
