//! ContentAccount repository.
//!
//! `reserve`/`rollback_reservation` are the two halves of the planner's
//! reservation contract: `reserve` marks a candidate as "being used" by an
//! in-flight run before the next selection proceeds; `rollback_reservation`
//! undoes it with saturating decrements if the item is never dispatched.
//! Candidate-selection queries implement the per-type strategies; `FOR UPDATE
//! SKIP LOCKED` keeps concurrent plans over the same account from picking the
//! same candidate, grounded on `TaskRepository::claim_next_task`'s claiming
//! pattern.

use repurposer_core::models::ContentAccount;
use repurposer_core::PipelineError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct ContentAccountRepository {
    pool: PgPool,
}

const COLUMNS: &str =
    "id, content_id, account_id, enabled, times_generated, times_posted, last_generated_at, created_at";

impl ContentAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Video "least `times_generated`" strategy candidates: main accounts or
    /// TikTok platform, filtered to `times_generated < reuse_window`
    /// `FOR UPDATE SKIP LOCKED` so a
    /// concurrent plan for a different run on the same account doesn't race
    /// for the same row.
    #[tracing::instrument(skip(self, tx), fields(db.table = "content_accounts"))]
    pub async fn lock_least_generated_video_candidate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
        reuse_window: i32,
    ) -> Result<Option<ContentAccount>, PipelineError> {
        let row = sqlx::query_as::<_, ContentAccount>(&format!(
            "SELECT {COLUMNS} FROM content_accounts \
             WHERE account_id = $1 AND enabled = true AND times_generated < $2 \
             ORDER BY times_generated ASC, last_generated_at ASC NULLS FIRST \
             LIMIT 1 FOR UPDATE SKIP LOCKED"
        ))
        .bind(account_id)
        .bind(reuse_window)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    /// Candidates with `last_generated_at IS NULL` — "never-generated"
    /// items.
    #[tracing::instrument(skip(self, tx), fields(db.table = "content_accounts"))]
    pub async fn lock_never_generated_candidate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
    ) -> Result<Option<ContentAccount>, PipelineError> {
        let row = sqlx::query_as::<_, ContentAccount>(&format!(
            "SELECT {COLUMNS} FROM content_accounts \
             WHERE account_id = $1 AND enabled = true AND last_generated_at IS NULL \
             ORDER BY created_at ASC LIMIT 1 FOR UPDATE SKIP LOCKED"
        ))
        .bind(account_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    /// Least-recently-generated fallback.
    #[tracing::instrument(skip(self, tx), fields(db.table = "content_accounts"))]
    pub async fn lock_least_recently_generated_candidate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
    ) -> Result<Option<ContentAccount>, PipelineError> {
        let row = sqlx::query_as::<_, ContentAccount>(&format!(
            "SELECT {COLUMNS} FROM content_accounts \
             WHERE account_id = $1 AND enabled = true \
             ORDER BY last_generated_at ASC NULLS FIRST LIMIT 1 FOR UPDATE SKIP LOCKED"
        ))
        .bind(account_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    /// "Popular recent" candidate pool: top `top_n` ContentAccounts by summed
    /// post view count within `window_days`. Tie-break picks
    /// `last_generated_at IS NULL` first, else earliest `last_generated_at`
    /// (applied by the caller over the returned, already- ranked pool).
    #[tracing::instrument(skip(self), fields(db.table = "content_accounts"))]
    pub async fn popular_recent_pool(
        &self,
        account_id: Uuid,
        window_days: i64,
        top_n: i64,
    ) -> Result<Vec<ContentAccount>, PipelineError> {
        let rows = sqlx::query_as::<_, ContentAccount>(&format!(
            r#"
            SELECT ca.id, ca.content_id, ca.account_id, ca.enabled, ca.times_generated,
                   ca.times_posted, ca.last_generated_at, ca.created_at
            FROM content_accounts ca
            JOIN posts p ON p.content_id = ca.content_id AND p.account_id = ca.account_id
            WHERE ca.account_id = $1
              AND ca.enabled = true
              AND p.created_at >= now() - ($2 || ' days')::interval
            GROUP BY ca.id
            ORDER BY SUM(p.view_count) DESC, ca.last_generated_at ASC NULLS FIRST
            LIMIT $3
            "#
        ))
        .bind(account_id)
        .bind(window_days)
        .bind(top_n)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Story/slideshow "next eligible in deterministic sequence"
    /// candidate. `reuse_cap`, when `Some`, applies the main-account slideshow
    /// `times_generated < 2` cap.
    #[tracing::instrument(skip(self, tx), fields(db.table = "content_accounts"))]
    pub async fn lock_next_sequential_candidate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
        reuse_cap: Option<i32>,
    ) -> Result<Option<ContentAccount>, PipelineError> {
        let row = if let Some(cap) = reuse_cap {
            sqlx::query_as::<_, ContentAccount>(&format!(
                "SELECT {COLUMNS} FROM content_accounts \
                 WHERE account_id = $1 AND enabled = true AND times_generated < $2 \
                 ORDER BY created_at ASC LIMIT 1 FOR UPDATE SKIP LOCKED"
            ))
            .bind(account_id)
            .bind(cap)
            .fetch_optional(&mut **tx)
            .await?
        } else {
            sqlx::query_as::<_, ContentAccount>(&format!(
                "SELECT {COLUMNS} FROM content_accounts \
                 WHERE account_id = $1 AND enabled = true \
                 ORDER BY created_at ASC LIMIT 1 FOR UPDATE SKIP LOCKED"
            ))
            .bind(account_id)
            .fetch_optional(&mut **tx)
            .await?
        };
        Ok(row)
    }

    /// Reservation: `(ContentAccount.times_generated += 1, last_generated_at
    /// := now)` and the mirrored `Content` row update,
    /// in one transaction.
    #[tracing::instrument(skip(self, tx), fields(db.table = "content_accounts", content_account_id = %content_account_id))]
    pub async fn reserve(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        content_account_id: Uuid,
        content_id: Uuid,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE content_accounts SET times_generated = times_generated + 1, \
             last_generated_at = now() WHERE id = $1",
        )
        .bind(content_account_id)
        .execute(&mut **tx)
        .await?;
        sqlx::query(
            "UPDATE contents SET times_generated = times_generated + 1, \
             last_generated_at = now() WHERE id = $1",
        )
        .bind(content_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Saturating rollback of [`Self::reserve`] when the item is never
    /// dispatched.
    #[tracing::instrument(skip(self), fields(db.table = "content_accounts", content_account_id = %content_account_id))]
    pub async fn rollback_reservation(
        &self,
        content_account_id: Uuid,
        content_id: Uuid,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE content_accounts SET times_generated = GREATEST(times_generated - 1, 0) \
             WHERE id = $1",
        )
        .bind(content_account_id)
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "UPDATE contents SET times_generated = GREATEST(times_generated - 1, 0) WHERE id = $1",
        )
        .bind(content_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "content_accounts"))]
    pub async fn get(&self, id: Uuid) -> Result<Option<ContentAccount>, PipelineError> {
        let row = sqlx::query_as::<_, ContentAccount>(&format!(
            "SELECT {COLUMNS} FROM content_accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Count existing `GeneratedContent` for this account/type, used by
    /// the posting-goal precondition.
    #[tracing::instrument(skip(self), fields(db.table = "generated_content"))]
    pub async fn count_generated(
        &self,
        account_id: Uuid,
        content_type: repurposer_core::models::ContentType,
    ) -> Result<i64, PipelineError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM generated_content WHERE account_id = $1 AND content_type = $2",
        )
        .bind(account_id)
        .bind(content_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
