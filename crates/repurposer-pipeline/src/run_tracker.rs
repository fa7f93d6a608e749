//! Run Tracker.
//!
//! Owns the life of one generation attempt. Thin orchestration around
//! [`RunRepository`]: counter recomputation and the retry-after-fail
//! reconciliation rule already live at the repository boundary; `complete`
//! here adds the one piece of policy the repository can't own alone —
//! releasing the associated lock, best-effort, before marking the run
//! terminal.

use chrono::{DateTime, Utc};
use repurposer_core::models::{AccountGenerationStatus, ContentType};
use repurposer_core::PipelineError;
use repurposer_db::{LockRepository, RunRepository};
use uuid::Uuid;

#[derive(Clone)]
pub struct RunTracker {
    runs: RunRepository,
    locks: LockRepository,
}

impl RunTracker {
    pub fn new(runs: RunRepository, locks: LockRepository) -> Self {
        Self { runs, locks }
    }

    pub async fn get(&self, run_id: Uuid) -> Result<AccountGenerationStatus, PipelineError> {
        self.runs.get(run_id).await
    }

    /// `createRun`: fresh row in `queuing`.
    pub async fn create_run(
        &self,
        account_id: Uuid,
        content_type: ContentType,
        total_requested: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.runs
            .create_run(account_id, content_type, total_requested)
            .await
    }

    pub async fn set_lock_id(&self, run_id: Uuid, lock_id: Uuid) -> Result<(), PipelineError> {
        self.runs.set_lock_id(run_id, lock_id).await
    }

    /// `setErrorCode(code, msg?)`: empty `msg` leaves the prior message
    /// untouched.
    pub async fn set_error_code(
        &self,
        run_id: Uuid,
        code: &str,
        message: Option<&str>,
    ) -> Result<(), PipelineError> {
        self.runs.set_error_code(run_id, code, message).await
    }

    /// "Partial availability": the planner reserved fewer than `quantity`
    /// items.
    pub async fn update_total_requested(
        &self,
        run_id: Uuid,
        total_requested: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.runs.update_total_requested(run_id, total_requested).await
    }

    pub async fn increment_queued(
        &self,
        run_id: Uuid,
        delta: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.runs.increment_queued(run_id, delta).await
    }

    pub async fn increment_processing(
        &self,
        run_id: Uuid,
        delta: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.runs.increment_processing(run_id, delta).await
    }

    pub async fn increment_completed(
        &self,
        run_id: Uuid,
        delta: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.runs.increment_completed(run_id, delta).await
    }

    pub async fn increment_failed(
        &self,
        run_id: Uuid,
        delta: i32,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.runs.increment_failed(run_id, delta).await
    }

    /// used by the render worker hook when it does not know the run id. A `None`
    /// result is a legitimate absorb-silently case on redelivery.
    pub async fn increment_processing_by_account(
        &self,
        account_id: Uuid,
        content_type: ContentType,
    ) -> Result<Option<AccountGenerationStatus>, PipelineError> {
        self.runs
            .increment_processing_by_account(account_id, content_type)
            .await
    }

    /// The bespoke retry-after-fail reconciliation rule.
    pub async fn reconcile_retry_after_fail(
        &self,
        run_id: Uuid,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.runs.reconcile_retry_after_fail(run_id).await
    }

    /// `complete`: releases the run's lock best-effort, then marks the run
    /// terminal. A run without a `lock_id` (shouldn't
    /// happen post-dispatch, but defensive for Recovery's call sites) simply
    /// skips the release.
    pub async fn complete(&self, run_id: Uuid) -> Result<AccountGenerationStatus, PipelineError> {
        let run = self.runs.get(run_id).await?;
        if let Some(lock_id) = run.lock_id {
            if let Err(e) = self.locks.release(lock_id).await {
                tracing::warn!(run_id = %run_id, lock_id = %lock_id, error = %e, "failed to release lock on run completion");
            }
        }
        self.runs.complete(run_id).await
    }

    pub async fn get_active(
        &self,
        account_id: Uuid,
        content_type: ContentType,
    ) -> Result<Option<AccountGenerationStatus>, PipelineError> {
        self.runs.get_active(account_id, content_type).await
    }

    pub async fn get_latest(
        &self,
        account_id: Uuid,
        content_type: ContentType,
    ) -> Result<Option<AccountGenerationStatus>, PipelineError> {
        self.runs.get_latest(account_id, content_type).await
    }

    /// `getHistory`: all content types, sorted by `started_at` desc.
    pub async fn get_history(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AccountGenerationStatus>, PipelineError> {
        self.runs.get_history(account_id, limit).await
    }

    pub async fn list_stale(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<AccountGenerationStatus>, PipelineError> {
        self.runs.list_stale(older_than).await
    }

    pub async fn set_counters(
        &self,
        run_id: Uuid,
        counters: repurposer_core::models::RunCounters,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.runs.set_counters(run_id, counters).await
    }
}
