use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContentType;

/// A persistent at-most-one marker per `(account_id, content_type)`. Creation
/// failure by uniqueness IS the busy signal — there is no in-process mutex
/// behind this.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GenerationLock {
    pub lock_id: Uuid,
    pub account_id: Uuid,
    pub content_type: ContentType,
    pub locked_at: DateTime<Utc>,
}

impl GenerationLock {
    /// `now - locked_at`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.locked_at
    }
}
