use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owns accounts and content; the authorization and file-retention scope. The
/// core treats `Client` as a thin foreign-key anchor — CRUD for clients lives
/// in the out-of-scope surrounding modules.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
