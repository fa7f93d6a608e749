//! Sync Status Tracker repository.
//!
//! Single-flight per account is enforced the same way as the lock registry's generation
//! lock: a partial unique index on `(account_id)` `WHERE is_active` turns a
//! concurrent `acquire_sync` into a Postgres `23505`, mapped to
//! `PipelineError::Busy`.

use chrono::{DateTime, Utc};
use repurposer_core::models::{derive_sync_status, AccountSyncStatus, SyncStatus};
use repurposer_core::{is_unique_violation, PipelineError};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct SyncStatusRepository {
    pool: PgPool,
}

const SYNC_COLUMNS: &str = "id, account_id, total_to_process, total_processed, total_synced, \
     total_failed, status, is_active, started_at, updated_at";

impl SyncStatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn recompute_status(&self, id: Uuid) -> Result<AccountSyncStatus, PipelineError> {
        let row = self.get(id).await?;
        let status = derive_sync_status(
            row.total_to_process,
            row.total_processed,
            row.total_synced,
            row.total_failed,
        );
        let is_active = !status.is_terminal();
        let updated = sqlx::query_as::<_, AccountSyncStatus>(&format!(
            "UPDATE account_sync_status SET status = $1, is_active = $2, updated_at = now() \
             WHERE id = $3 RETURNING {SYNC_COLUMNS}"
        ))
        .bind(status)
        .bind(is_active)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_sync_status"))]
    pub async fn get(&self, id: Uuid) -> Result<AccountSyncStatus, PipelineError> {
        let row = sqlx::query_as::<_, AccountSyncStatus>(&format!(
            "SELECT {SYNC_COLUMNS} FROM account_sync_status WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| PipelineError::NotFound(format!("sync status {id}")))?;
        Ok(row)
    }

    /// `acquireSync(account_id, total_to_process) -> id | BUSY`. The
    /// unique `(account_id) WHERE is_active` index is the single-flight
    /// guard.
    #[tracing::instrument(skip(self), fields(db.table = "account_sync_status"))]
    pub async fn acquire_sync(
        &self,
        account_id: Uuid,
        total_to_process: i32,
    ) -> Result<AccountSyncStatus, PipelineError> {
        let id = Uuid::new_v4();
        let result = sqlx::query_as::<_, AccountSyncStatus>(&format!(
            r#"
            INSERT INTO account_sync_status
                (id, account_id, total_to_process, total_processed, total_synced,
                 total_failed, status, is_active, started_at, updated_at)
            VALUES ($1, $2, $3, 0, 0, 0, $4, true, now(), now())
            RETURNING {SYNC_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(account_id)
        .bind(total_to_process)
        .bind(SyncStatus::Syncing)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(e) if is_unique_violation(&e) => {
                Err(PipelineError::Busy(format!("sync already active for account {account_id}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn bump(&self, id: Uuid, column: &str, delta: i32) -> Result<(), PipelineError> {
        let sql = format!(
            "UPDATE account_sync_status SET {column} = {column} + $1, updated_at = now() WHERE id = $2"
        );
        sqlx::query(&sql).bind(delta).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_sync_status"))]
    pub async fn increment_processed(&self, id: Uuid, delta: i32) -> Result<AccountSyncStatus, PipelineError> {
        self.bump(id, "total_processed", delta).await?;
        self.recompute_status(id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_sync_status"))]
    pub async fn increment_synced(&self, id: Uuid, delta: i32) -> Result<AccountSyncStatus, PipelineError> {
        self.bump(id, "total_synced", delta).await?;
        self.recompute_status(id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_sync_status"))]
    pub async fn increment_failed(&self, id: Uuid, delta: i32) -> Result<AccountSyncStatus, PipelineError> {
        self.bump(id, "total_failed", delta).await?;
        self.recompute_status(id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_sync_status"))]
    pub async fn complete(&self, id: Uuid) -> Result<AccountSyncStatus, PipelineError> {
        self.recompute_status(id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_sync_status"))]
    pub async fn get_active(&self, account_id: Uuid) -> Result<Option<AccountSyncStatus>, PipelineError> {
        let row = sqlx::query_as::<_, AccountSyncStatus>(&format!(
            "SELECT {SYNC_COLUMNS} FROM account_sync_status \
             WHERE account_id = $1 AND is_active = true LIMIT 1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_sync_status"))]
    pub async fn get_latest(&self, account_id: Uuid) -> Result<Option<AccountSyncStatus>, PipelineError> {
        let row = sqlx::query_as::<_, AccountSyncStatus>(&format!(
            "SELECT {SYNC_COLUMNS} FROM account_sync_status \
             WHERE account_id = $1 ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Startup reconciliation: any row still `is_active` from before a
    /// crash is no longer being driven by a live worker and must be forced
    /// `failed`.
    #[tracing::instrument(skip(self), fields(db.table = "account_sync_status"))]
    pub async fn fail_stale_active(&self, older_than: DateTime<Utc>) -> Result<u64, PipelineError> {
        let result = sqlx::query(
            "UPDATE account_sync_status SET status = $1, is_active = false, updated_at = now() \
             WHERE is_active = true AND updated_at < $2",
        )
        .bind(SyncStatus::Failed)
        .bind(older_than)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
