//! Lock Registry repository.
//!
//! The unique index on `(account_id, content_type)` IS the mutual-exclusion
//! primitive; `acquire` turns a Postgres `23505` on insert into
//! `PipelineError::Busy`.

use chrono::{DateTime, Utc};
use repurposer_core::models::{ContentType, GenerationLock};
use repurposer_core::{is_unique_violation, PipelineError};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct LockRepository {
    pool: PgPool,
}

impl LockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `acquire(account_id, content_type) -> lock_id | BUSY`.
    #[tracing::instrument(skip(self), fields(db.table = "generation_locks"))]
    pub async fn acquire(
        &self,
        account_id: Uuid,
        content_type: ContentType,
    ) -> Result<Uuid, PipelineError> {
        let lock_id = Uuid::new_v4();
        let result = sqlx::query(
            r#"
            INSERT INTO generation_locks (lock_id, account_id, content_type, locked_at)
            VALUES ($1, $2, $3, now())
            "#,
        )
        .bind(lock_id)
        .bind(account_id)
        .bind(content_type)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(lock_id),
            Err(e) if is_unique_violation(&e) => Err(PipelineError::Busy(format!(
                "generation already active for account {account_id}, type {content_type}"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent; missing lock is not an error.
    #[tracing::instrument(skip(self), fields(db.table = "generation_locks"))]
    pub async fn release(&self, lock_id: Uuid) -> Result<(), PipelineError> {
        sqlx::query("DELETE FROM generation_locks WHERE lock_id = $1")
            .bind(lock_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "generation_locks"))]
    pub async fn list_all(&self) -> Result<Vec<GenerationLock>, PipelineError> {
        let locks = sqlx::query_as::<_, GenerationLock>(
            "SELECT lock_id, account_id, content_type, locked_at FROM generation_locks",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(locks)
    }

    #[tracing::instrument(skip(self), fields(db.table = "generation_locks"))]
    pub async fn list_expired(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<GenerationLock>, PipelineError> {
        let locks = sqlx::query_as::<_, GenerationLock>(
            "SELECT lock_id, account_id, content_type, locked_at FROM generation_locks \
             WHERE locked_at < $1",
        )
        .bind(older_than)
        .fetch_all(&self.pool)
        .await?;
        Ok(locks)
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "generation_locks", count = ids.len()))]
    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, PipelineError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM generation_locks WHERE lock_id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_is_nonnegative_for_past_locks() {
        let lock = GenerationLock {
            lock_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            content_type: ContentType::Video,
            locked_at: Utc::now() - chrono::Duration::hours(1),
        };
        assert!(lock.age(Utc::now()) >= chrono::Duration::minutes(59));
    }
}
