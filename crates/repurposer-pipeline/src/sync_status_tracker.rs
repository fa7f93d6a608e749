//! Sync Status Tracker.
//!
//! Mirrors [`crate::run_tracker::RunTracker`]'s shape: thin orchestration
//! around [`SyncStatusRepository`], whose single-flight guard and counter
//! recomputation already live at the repository boundary. Unlike a generation
//! run, a sync has no associated lock to release on completion — single-
//! flight is enforced purely by `is_active`, which the repository clears
//! itself as part of recompute.

use repurposer_core::models::AccountSyncStatus;
use repurposer_core::PipelineError;
use repurposer_db::SyncStatusRepository;
use uuid::Uuid;

#[derive(Clone)]
pub struct SyncStatusTracker {
    repository: SyncStatusRepository,
}

impl SyncStatusTracker {
    pub fn new(repository: SyncStatusRepository) -> Self {
        Self { repository }
    }

    pub async fn get(&self, id: Uuid) -> Result<AccountSyncStatus, PipelineError> {
        self.repository.get(id).await
    }

    /// `acquireSync(account_id, total_to_process) -> id | BUSY`.
    pub async fn acquire_sync(
        &self,
        account_id: Uuid,
        total_to_process: i32,
    ) -> Result<AccountSyncStatus, PipelineError> {
        self.repository.acquire_sync(account_id, total_to_process).await
    }

    pub async fn increment_processed(&self, id: Uuid, delta: i32) -> Result<AccountSyncStatus, PipelineError> {
        self.repository.increment_processed(id, delta).await
    }

    pub async fn increment_synced(&self, id: Uuid, delta: i32) -> Result<AccountSyncStatus, PipelineError> {
        self.repository.increment_synced(id, delta).await
    }

    pub async fn increment_failed(&self, id: Uuid, delta: i32) -> Result<AccountSyncStatus, PipelineError> {
        self.repository.increment_failed(id, delta).await
    }

    pub async fn complete(&self, id: Uuid) -> Result<AccountSyncStatus, PipelineError> {
        self.repository.complete(id).await
    }

    pub async fn get_active(&self, account_id: Uuid) -> Result<Option<AccountSyncStatus>, PipelineError> {
        self.repository.get_active(account_id).await
    }

    pub async fn get_latest(&self, account_id: Uuid) -> Result<Option<AccountSyncStatus>, PipelineError> {
        self.repository.get_latest(account_id).await
    }

    /// Startup reconciliation: any row left `is_active` by a crash
    /// is forced `failed` before the service accepts new sync requests.
    pub async fn fail_stale_active(&self, older_than: chrono::DateTime<chrono::Utc>) -> Result<u64, PipelineError> {
        self.repository.fail_stale_active(older_than).await
    }
}
