//! Event Stream.
//!
//! A best-effort fan-out over [`repurposer_infra::EventBus`]: subscribers
//! register a filter `{account_id}` and only see events whose payload carries
//! a matching `account_id`. The transport itself (drop frames to a lagging
//! subscriber rather than block the publisher) lives in the infra crate; this
//! component owns the publish call sites the rest of the pipeline uses and
//! the per-subscriber account filter.

use repurposer_core::models::{AccountGenerationStatus, AccountSyncStatus};
use repurposer_core::PipelineEvent;
use repurposer_infra::EventBus;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Clone)]
pub struct EventStream {
    bus: EventBus,
}

impl EventStream {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn publish_run_created(&self, run: &AccountGenerationStatus) {
        self.bus.publish(PipelineEvent::new(
            run.account_id,
            "run_created",
            serde_json::json!(run),
        ));
    }

    pub fn publish_run_updated(&self, run: &AccountGenerationStatus) {
        self.bus.publish(PipelineEvent::new(
            run.account_id,
            "run_updated",
            serde_json::json!(run),
        ));
    }

    pub fn publish_sync_started(&self, sync: &AccountSyncStatus) {
        self.bus.publish(PipelineEvent::new(
            sync.account_id,
            "sync_started",
            serde_json::json!(sync),
        ));
    }

    pub fn publish_sync_updated(&self, sync: &AccountSyncStatus) {
        self.bus.publish(PipelineEvent::new(
            sync.account_id,
            "sync_updated",
            serde_json::json!(sync),
        ));
    }

    /// Subscribes to the raw bus; the returned receiver sees every account's
    /// events. Callers filter with [`Self::matches`] before forwarding a
    /// frame to one subscriber's
    /// connection.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.bus.subscribe()
    }

    pub fn matches(account_id: Uuid, event: &PipelineEvent) -> bool {
        event.account_id == account_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_only_sees_matching_account_events() {
        let stream = EventStream::new(EventBus::new());
        let mut rx = stream.subscribe();

        let target = Uuid::new_v4();
        let other = Uuid::new_v4();

        stream.bus.publish(PipelineEvent::new(other, "run_updated", serde_json::json!({})));
        stream.bus.publish(PipelineEvent::new(target, "run_updated", serde_json::json!({})));

        let first = rx.recv().await.unwrap();
        assert!(!EventStream::matches(target, &first));
        let second = rx.recv().await.unwrap();
        assert!(EventStream::matches(target, &second));
    }
}
