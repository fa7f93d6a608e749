//! Run Tracker repository.
//!
//! Counter increments are plain `UPDATE ... SET x = x + $delta` statements,
//! deliberately NOT wrapped in the same transaction as the status recompute
//! that follows them: throughput matters more than an always-consistent
//! intermediate `status`, and the recovery scheduler's stuck-run fixer is the authoritative
//! repair for the transient drift this allows.

use chrono::{DateTime, Utc};
use repurposer_core::models::{
    derive_run_status, AccountGenerationStatus, ContentType, RunCounters, RunStatus,
};
use repurposer_core::PipelineError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct RunRepository {
    pool: PgPool,
}

const RUN_COLUMNS: &str = "id, account_id, content_type, total_requested, total_queued, \
     total_processing, total_completed, total_failed, status, started_at, lock_id, \
     error_code, error_message, updated_at";

impl RunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recompute and persist `status` from the run's current counters.
    /// Called after every counter mutation.
    async fn recompute_status(&self, run_id: Uuid) -> Result<AccountGenerationStatus, PipelineError> {
        let run = self.get(run_id).await?;
        let status = derive_run_status(run.counters());
        let updated = sqlx::query_as::<_, AccountGenerationStatus>(&format!(
            "UPDATE account_generation_status SET status = $1, updated_at = now() \
             WHERE id = $2 RETURNING {RUN_COLUMNS}"
        ))
        .bind(status)
        .bind(run_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn get(&self, run_id: Uuid) -> Result<AccountGenerationStatus, PipelineError> {
        let run = sqlx::query_as::<_, AccountGenerationStatus>(&format!(
            "SELECT {RUN_COLUMNS} FROM account_generation_status WHERE id = $1"
        ))
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| PipelineError::NotFound(format!("run {run_id}")))?;
        Ok(run)
    }

    /// `createRun`: fresh row in `queuing`, `started_at` null.
    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn create_run(
        &self,
        account_id: Uuid,
        content_type: ContentType,
        total_requested: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        let run = sqlx::query_as::<_, AccountGenerationStatus>(&format!(
            r#"
            INSERT INTO account_generation_status
                (id, account_id, content_type, total_requested, total_queued,
                 total_processing, total_completed, total_failed, status,
                 started_at, lock_id, error_code, error_message, updated_at)
            VALUES ($1, $2, $3, $4, 0, 0, 0, 0, $5, NULL, NULL, NULL, NULL, now())
            RETURNING {RUN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(content_type)
        .bind(total_requested)
        .bind(RunStatus::Queuing)
        .fetch_one(&self.pool)
        .await?;
        Ok(run)
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn set_lock_id(&self, run_id: Uuid, lock_id: Uuid) -> Result<(), PipelineError> {
        sqlx::query("UPDATE account_generation_status SET lock_id = $1, updated_at = now() WHERE id = $2")
            .bind(lock_id)
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// `setErrorCode(code, msg?)`: empty `msg` leaves the prior message
    /// untouched.
    #[tracing::instrument(skip(self, message), fields(db.table = "account_generation_status"))]
    pub async fn set_error_code(
        &self,
        run_id: Uuid,
        code: &str,
        message: Option<&str>,
    ) -> Result<(), PipelineError> {
        match message {
            Some(msg) if !msg.is_empty() => {
                sqlx::query(
                    "UPDATE account_generation_status SET error_code = $1, error_message = $2, \
                     updated_at = now() WHERE id = $3",
                )
                .bind(code)
                .bind(msg)
                .bind(run_id)
                .execute(&self.pool)
                .await?;
            }
            _ => {
                sqlx::query(
                    "UPDATE account_generation_status SET error_code = $1, updated_at = now() \
                     WHERE id = $2",
                )
                .bind(code)
                .bind(run_id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// "Partial availability": the caller calls this when the planner
    /// reserved fewer than `quantity` items.
    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn update_total_requested(
        &self,
        run_id: Uuid,
        total_requested: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        sqlx::query(
            "UPDATE account_generation_status SET total_requested = $1, updated_at = now() \
             WHERE id = $2",
        )
        .bind(total_requested)
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        self.recompute_status(run_id).await
    }

    async fn bump(&self, run_id: Uuid, column: &str, delta: i32) -> Result<(), PipelineError> {
        let sql = format!(
            "UPDATE account_generation_status SET {column} = {column} + $1, updated_at = now() \
             WHERE id = $2"
        );
        sqlx::query(&sql)
            .bind(delta)
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Sets `started_at` on the first processing increment if still null
    async fn set_started_at_if_unset(&self, run_id: Uuid) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE account_generation_status SET started_at = now() \
             WHERE id = $1 AND started_at IS NULL",
        )
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn increment_queued(
        &self,
        run_id: Uuid,
        delta: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.bump(run_id, "total_queued", delta).await?;
        self.recompute_status(run_id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn increment_processing(
        &self,
        run_id: Uuid,
        delta: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.set_started_at_if_unset(run_id).await?;
        self.bump(run_id, "total_processing", delta).await?;
        self.recompute_status(run_id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn increment_completed(
        &self,
        run_id: Uuid,
        delta: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.bump(run_id, "total_completed", delta).await?;
        self.recompute_status(run_id).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn increment_failed(
        &self,
        run_id: Uuid,
        delta: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.bump(run_id, "total_failed", delta).await?;
        self.recompute_status(run_id).await
    }

    /// used by the render worker hook when it does not know the run id — finds the active run
    /// on `(account, type)` and bumps `total_processing`. May legitimately
    /// fail to find an active run on retries where
    /// `total_queued` already drained; that case is absorbed by the
    /// caller, not here.
    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn increment_processing_by_account(
        &self,
        account_id: Uuid,
        content_type: ContentType,
    ) -> Result<Option<AccountGenerationStatus>, PipelineError> {
        let Some(run) = self.get_active(account_id, content_type).await? else {
            return Ok(None);
        };
        Ok(Some(self.increment_processing(run.id, 1).await?))
    }

    /// the bespoke retry-after-fail reconciliation rule, also used
    /// by the render worker hook. Decrements `total_failed`, increments
    /// `total_completed`, then recomputes.
    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn reconcile_retry_after_fail(
        &self,
        run_id: Uuid,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        sqlx::query(
            "UPDATE account_generation_status \
             SET total_failed = GREATEST(total_failed - 1, 0), \
                 total_completed = total_completed + 1, \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        self.recompute_status(run_id).await
    }

    /// `complete`: releases the lock best-effort (caller's job — the lock
    /// repository is a separate dependency) then marks the run terminal
    /// If the run's derived status isn't already terminal, this
    /// forces the terminal-by-counters-exhausted outcome the caller computed;
    /// callers that need the stuck-run fixer's repair semantics use
    /// [`crate::db::run_repository::RunRepository::recompute_status`]
    /// indirectly via the increment methods instead.
    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn complete(&self, run_id: Uuid) -> Result<AccountGenerationStatus, PipelineError> {
        self.recompute_status(run_id).await
    }

    /// At most one row per `(account_id, content_type)` has status in
    /// `{queuing, processing}`.
    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn get_active(
        &self,
        account_id: Uuid,
        content_type: ContentType,
    ) -> Result<Option<AccountGenerationStatus>, PipelineError> {
        let run = sqlx::query_as::<_, AccountGenerationStatus>(&format!(
            "SELECT {RUN_COLUMNS} FROM account_generation_status \
             WHERE account_id = $1 AND content_type = $2 \
               AND status IN ('queuing', 'processing') \
             LIMIT 1"
        ))
        .bind(account_id)
        .bind(content_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(run)
    }

    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn get_latest(
        &self,
        account_id: Uuid,
        content_type: ContentType,
    ) -> Result<Option<AccountGenerationStatus>, PipelineError> {
        let run = sqlx::query_as::<_, AccountGenerationStatus>(&format!(
            "SELECT {RUN_COLUMNS} FROM account_generation_status \
             WHERE account_id = $1 AND content_type = $2 \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(account_id)
        .bind(content_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(run)
    }

    /// `getHistory`: all content types, sorted by `started_at` desc.
    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn get_history(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AccountGenerationStatus>, PipelineError> {
        let runs = sqlx::query_as::<_, AccountGenerationStatus>(&format!(
            "SELECT {RUN_COLUMNS} FROM account_generation_status \
             WHERE account_id = $1 \
             ORDER BY started_at DESC NULLS LAST LIMIT $2"
        ))
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(runs)
    }

    /// Runs with stale `updated_at` and a non-terminal status — the recovery scheduler's
    /// stuck-run fixer candidate set.
    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn list_stale(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<AccountGenerationStatus>, PipelineError> {
        let runs = sqlx::query_as::<_, AccountGenerationStatus>(&format!(
            "SELECT {RUN_COLUMNS} FROM account_generation_status \
             WHERE updated_at < $1 AND status IN ('queuing', 'processing')"
        ))
        .bind(older_than)
        .fetch_all(&self.pool)
        .await?;
        Ok(runs)
    }

    /// Raw counter write used only by the recovery scheduler's counter-drift repair,
    /// which needs to move specific amounts between buckets atomically.
    #[tracing::instrument(skip(self), fields(db.table = "account_generation_status"))]
    pub async fn set_counters(
        &self,
        run_id: Uuid,
        counters: RunCounters,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        sqlx::query(
            "UPDATE account_generation_status \
             SET total_requested = $1, total_queued = $2, total_processing = $3, \
                 total_completed = $4, total_failed = $5, updated_at = now() \
             WHERE id = $6",
        )
        .bind(counters.total_requested)
        .bind(counters.total_queued)
        .bind(counters.total_processing)
        .bind(counters.total_completed)
        .bind(counters.total_failed)
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        self.recompute_status(run_id).await
    }
}
