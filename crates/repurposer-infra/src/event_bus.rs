//! The `repurposer:events` pub/sub transport.
//!
//! A single process-wide [`tokio::sync::broadcast`] channel. Publishers never
//! block: a lagging subscriber observes `RecvError::Lagged` on its next
//! receive and resynchronizes (it simply misses the events it fell behind on)
//! rather than slowing the publisher down, a "drop frames to slow
//! subscribers" policy.

use repurposer_core::PipelineEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1024;

/// Cloneable handle onto the shared event channel. Every clone publishes to
/// and can subscribe from the same underlying broadcast bus.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event. Returns the number of active subscribers that
    /// received it; `Err` only when there are currently no subscribers, which
    /// is not a failure for the publisher.
    pub fn publish(&self, event: PipelineEvent) {
        // No subscribers is the common case between client connections;
        // the event is simply dropped, per the "no persistence, no replay"
 // rule.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let account_id = Uuid::new_v4();
        bus.publish(PipelineEvent::new(
            account_id,
            "run_updated",
            serde_json::json!({"status": "processing"}),
        ));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.account_id, account_id);
        assert_eq!(event.event_type, "run_updated");
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(PipelineEvent::new(
            Uuid::new_v4(),
            "run_created",
            serde_json::json!({}),
        ));
    }

    #[tokio::test]
    async fn lagging_subscriber_resyncs_instead_of_blocking_publisher() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();

        for i in 0..5 {
            bus.publish(PipelineEvent::new(
                Uuid::new_v4(),
                "run_updated",
                serde_json::json!({"i": i}),
            ));
        }

        // The channel overflowed; the receiver observes a Lagged error and
        // can resynchronize rather than the publisher ever blocking.
        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            Ok(_) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
