//! Event payloads for the run event stream.
//!
//! `PipelineEvent` is the shape published on the `repurposer:events` pub/sub
//! channel: a numeric `account_id` subscribers filter on, a string
//! `event_type`, and a JSON payload. The transport (fan-out, backpressure)
//! lives in the infra crate; this type is the wire contract both it and the
//! pipeline crate share.

use serde::Serialize;
use uuid::Uuid;

/// A single event published to `repurposer:events`. `event_type` values used
/// by the pipeline: `run_created`, `run_updated`, `sync_started`,
/// `sync_updated`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineEvent {
    pub account_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl PipelineEvent {
    pub fn new(account_id: Uuid, event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            account_id,
            event_type: event_type.into(),
            payload,
        }
    }

    /// Renders the SSE frame format fixed by : `event: <event_type>\ndata:
    /// <json>\n\n`.
    pub fn to_sse_frame(&self) -> String {
        format!(
            "event: {}\ndata: {}\n\n",
            self.event_type,
            serde_json::to_string(&self.payload).unwrap_or_else(|_| "{}".to_string())
        )
    }
}

/// The fixed SSE keepalive comment line.
pub const SSE_HEARTBEAT_FRAME: &str = ": heartbeat\n\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_frame_matches_fixed_format() {
        let event = PipelineEvent::new(
            Uuid::nil(),
            "run_updated",
            serde_json::json!({"status": "processing"}),
        );
        let frame = event.to_sse_frame();
        assert!(frame.starts_with("event: run_updated\ndata: "));
        assert!(frame.ends_with("\n\n"));
    }
}
