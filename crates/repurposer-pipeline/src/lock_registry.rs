//! Lock Registry.
//!
//! Thin orchestration wrapper around [`LockRepository`]: the repository
//! already translates a uniqueness violation into `PipelineError::Busy` at
//! the boundary, so this component adds no logic of its own beyond naming the
//! contract the dispatcher and recovery scheduler depend on.

use chrono::{DateTime, Utc};
use repurposer_core::models::ContentType;
use repurposer_core::PipelineError;
use repurposer_db::LockRepository;
use uuid::Uuid;

#[derive(Clone)]
pub struct LockRegistry {
    repository: LockRepository,
}

impl LockRegistry {
    pub fn new(repository: LockRepository) -> Self {
        Self { repository }
    }

    /// `acquire(account_id, content_type) -> lock_id | BUSY`.
    pub async fn acquire(
        &self,
        account_id: Uuid,
        content_type: ContentType,
    ) -> Result<Uuid, PipelineError> {
        self.repository.acquire(account_id, content_type).await
    }

    /// Idempotent; missing lock is not an error.
    pub async fn release(&self, lock_id: Uuid) -> Result<(), PipelineError> {
        self.repository.release(lock_id).await
    }

    pub async fn list_all(&self) -> Result<Vec<repurposer_core::models::GenerationLock>, PipelineError> {
        self.repository.list_all().await
    }

    pub async fn list_expired(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<repurposer_core::models::GenerationLock>, PipelineError> {
        self.repository.list_expired(older_than).await
    }

    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, PipelineError> {
        self.repository.delete_many(ids).await
    }
}

#[cfg(test)]
mod tests {
    // Exercised end-to-end by `recovery`'s unit tests and by the
    // dispatcher's acquire/release happy-path tests; this wrapper has no
    // behavior of its own to test in isolation beyond what the repository
    // layer already covers.
}
