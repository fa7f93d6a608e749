use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContentType;

/// The task-queue payload the dispatcher submits for a `video` item. Workers
/// call back into the render worker hook with the full request plus a
/// [`RenderTaskOutcome`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderTaskRequest {
    pub run_id: Uuid,
    pub file_id: i64,
    pub account_id: Uuid,
    pub content_id: Uuid,
    pub content_account_id: Uuid,
    pub content_type: ContentType,
    pub text_overlay: Option<String>,
    pub text_overlay_id: Option<Uuid>,
    pub main_account: bool,
    pub use_mirror: bool,
    pub use_overlays: bool,
}

/// The successful result of a render task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderTaskSuccess {
    pub rendered_file_id: i64,
    pub thumbnail_file_id: i64,
    pub video_hash: String,
    pub thumbnail_hash: String,
    pub processing_time_ms: i64,
}

/// Outcome of a render task as reported by the task queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RenderTaskOutcome {
    Success(RenderTaskSuccess),
    Failure { message: String },
}
