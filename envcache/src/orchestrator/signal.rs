//! The "are there any runtimes" signal.

use std::sync::Arc;

use tokio::sync::watch;

/// Latches to `true` once any settled scan found at least one runtime.
///
/// Empty or failed scans set it to `false` only while it has never been
/// `true`. Clones share state.
#[derive(Clone, Debug)]
pub struct HasRuntimesSignal {
    state: Arc<watch::Sender<Option<bool>>>,
}

impl HasRuntimesSignal {
    /// Create an unset signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Record a scan outcome. Returns whether the value changed.
    pub fn observe(&self, found_any: bool) -> bool {
        self.state.send_if_modified(|state| match *state {
            Some(true) => false,
            Some(current) if current == found_any => false,
            _ => {
                *state = Some(found_any);
                true
            }
        })
    }

    /// The last known state, `false` if no scan has settled yet.
    pub fn get(&self) -> bool {
        self.state.borrow().unwrap_or(false)
    }

    /// Whether any scan outcome was observed yet.
    pub fn is_set(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Wait until the first outcome is observed, then return the state.
    pub async fn wait_for_first_outcome(&self) -> bool {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(Option::is_some).await {
            Ok(state) => *state,
            Err(_) => None,
        };
        state.unwrap_or(false)
    }
}

impl Default for HasRuntimesSignal {
    fn default() -> Self {
        Self::new()
    }
}
