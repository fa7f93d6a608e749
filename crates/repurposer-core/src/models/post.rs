use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An observed external publication. `url` is unique — the idempotency guard
/// `PostContent` relies on.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub platform: String,
    pub url: String,
    pub account_id: Uuid,
    pub thumbnail_id: i64,
    pub content_id: Option<Uuid>,
    pub generated_content_id: Option<Uuid>,
    pub is_tracked: bool,
    /// View count as last reported by the social media gateway. `0` when the
    /// gateway didn't report one.
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}
