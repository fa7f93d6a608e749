use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContentType;

/// Artifact produced from one `ContentAccount` for one run. For `video` the
/// files are new renders exclusively owned by this row; for
/// `story`/`slideshow` they alias the source `ContentFile` rows and MUST NOT
/// be deleted when this row is removed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeneratedContent {
    pub id: Uuid,
    pub content_type: ContentType,
    pub account_id: Uuid,
    pub content_id: Uuid,
    pub content_account_id: Uuid,
    pub is_posted: bool,
    pub used_mirror: bool,
    pub used_overlay: bool,
    pub created_at: DateTime<Utc>,
}

/// One rendered (or aliased) file belonging to a [`GeneratedContent`].
/// `file_hash` is the idempotency key the render worker hook guards on (`content_account_id`,
/// `file_hash`) before inserting.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeneratedContentFile {
    pub id: Uuid,
    pub generated_content_id: Uuid,
    pub file_id: i64,
    pub thumbnail_id: i64,
    pub file_hash: String,
    pub thumbnail_hash: String,
    /// True when this file is an alias of a source `ContentFile` blob
    /// (story/slideshow) rather than an owned render (video). Governs whether
    /// deletion of the parent row enqueues a blob delete
    pub is_aliased: bool,
}
