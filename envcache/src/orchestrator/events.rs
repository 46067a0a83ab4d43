//! "Discovery started" fan-out.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::pending::PendingResult;

/// Receiver half handed to subscribers.
pub type DiscoveryStartedReceiver = mpsc::UnboundedReceiver<PendingResult>;

/// Delivers every started scan, in start order, to every live subscriber.
///
/// Each subscriber has its own unbounded queue, so a slow reader never loses
/// events. Subscribers whose receiver was dropped are pruned on the next
/// publish.
#[derive(Default)]
pub(crate) struct StartedEvents {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PendingResult>>>,
}

impl StartedEvents {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self) -> DiscoveryStartedReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Publish under the lock so all subscribers observe one order.
    pub(crate) fn publish(&self, pending: &PendingResult) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(pending.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_event_reaches_every_subscriber_in_order() {
        let events = StartedEvents::new();
        let mut first = events.subscribe();
        let mut second = events.subscribe();

        let published: Vec<_> = (0..40).map(|_| PendingResult::new()).collect();
        for pending in &published {
            events.publish(pending);
        }

        for rx in [&mut first, &mut second] {
            for expected in &published {
                assert!(rx.try_recv().unwrap().ptr_eq(expected));
            }
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let events = StartedEvents::new();
        let kept = events.subscribe();
        drop(events.subscribe());
        assert_eq!(events.subscriber_count(), 2);

        events.publish(&PendingResult::new());

        assert_eq!(events.subscriber_count(), 1);
        drop(kept);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let events = StartedEvents::new();
        events.publish(&PendingResult::new());

        let mut late = events.subscribe();
        assert!(late.try_recv().is_err());
    }
}
