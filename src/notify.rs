//! Leadership Notifier
//!
//! Typed broadcast of the "leader elected" event. Downstream leader-only
//! work (schedulers, migration runners, seeders) subscribes before
//! bootstrap and re-runs its startup logic on every emission.
//!
//! The event can fire more than once per process lifetime: a reconnect
//! cycle that ends in a fresh claim publishes again. Subscribers must be
//! idempotent. Delivery is fire-and-forget; subscribers registered after
//! an emission do not see it.

use tokio::sync::broadcast;

/// Name of the emitted application event
pub const LEADER_ELECTED_EVENT: &str = "zkelect:leaderElected";

/// Payload of the leadership event
///
/// `leading` is always true under the current protocol (there is no
/// step-down); the field carries the wire contract's boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderElected {
    pub leading: bool,
}

/// Publishes leadership events to any number of subscribers
#[derive(Debug, Clone)]
pub struct LeadershipNotifier {
    tx: broadcast::Sender<LeaderElected>,
}

impl LeadershipNotifier {
    /// Create a notifier with the given subscriber backlog capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to leadership events
    ///
    /// Subscribe before bootstrapping the engine; emissions are not
    /// replayed to late subscribers.
    pub fn subscribe(&self) -> broadcast::Receiver<LeaderElected> {
        self.tx.subscribe()
    }

    /// Publish a leadership event, at most once per successful claim
    pub fn publish(&self) {
        match self.tx.send(LeaderElected { leading: true }) {
            Ok(receivers) => {
                tracing::info!("Emitted {} to {} subscriber(s)", LEADER_ELECTED_EVENT, receivers);
            }
            Err(_) => {
                tracing::debug!("Emitted {} with no subscribers", LEADER_ELECTED_EVENT);
            }
        }
    }
}

impl Default for LeadershipNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let notifier = LeadershipNotifier::default();
        let mut rx = notifier.subscribe();

        notifier.publish();

        let event = rx.recv().await.unwrap();
        assert!(event.leading);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let notifier = LeadershipNotifier::default();
        // No panic, no error surface
        notifier.publish();

        // A late subscriber does not see the earlier emission
        let mut rx = notifier.subscribe();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_multiple_emissions_reach_one_subscriber() {
        let notifier = LeadershipNotifier::default();
        let mut rx = notifier.subscribe();

        notifier.publish();
        notifier.publish();

        assert!(rx.recv().await.unwrap().leading);
        assert!(rx.recv().await.unwrap().leading);
    }
}
