use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The edge `(Content x Account)` capturing that a `Content` is eligible for
/// generation on an `Account`. Carries the per-edge counters the selection
/// planner reads and mutates during reservation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentAccount {
    pub id: Uuid,
    pub content_id: Uuid,
    pub account_id: Uuid,
    pub enabled: bool,
    pub times_generated: i32,
    pub times_posted: i32,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
