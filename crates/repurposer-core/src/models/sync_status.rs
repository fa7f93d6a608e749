use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Mirrors [`crate::models::RunStatus`] for post-sync.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Syncing,
    Completed,
    Failed,
    Partial,
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Completed => write!(f, "completed"),
            SyncStatus::Failed => write!(f, "failed"),
            SyncStatus::Partial => write!(f, "partial"),
        }
    }
}

impl FromStr for SyncStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "syncing" => Ok(SyncStatus::Syncing),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            "partial" => Ok(SyncStatus::Partial),
            _ => Err(anyhow::anyhow!("invalid sync status: {s}")),
        }
    }
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncStatus::Syncing)
    }
}

/// One row per post-sync attempt. Single-flight per account via the unique
/// `(account_id, is_active=true)` index.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccountSyncStatus {
    pub id: Uuid,
    pub account_id: Uuid,
    pub total_to_process: i32,
    pub total_processed: i32,
    pub total_synced: i32,
    pub total_failed: i32,
    pub status: SyncStatus,
    pub is_active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Derive [`SyncStatus`] from counters, mirroring
/// [`crate::models::derive_run_status`].
pub fn derive_sync_status(
    total_to_process: i32,
    total_processed: i32,
    total_synced: i32,
    total_failed: i32,
) -> SyncStatus {
    if total_processed < total_to_process {
        return SyncStatus::Syncing;
    }
    if total_synced == total_to_process {
        return SyncStatus::Completed;
    }
    if total_failed == total_to_process {
        return SyncStatus::Failed;
    }
    SyncStatus::Partial
}
