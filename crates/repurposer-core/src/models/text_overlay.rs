use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An optional caption associated with an account, selected at random at
/// generation time for non-main accounts when the source content has overlays
/// enabled.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TextOverlay {
    pub id: Uuid,
    pub account_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
