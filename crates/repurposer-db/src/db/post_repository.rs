//! Post Reconciler repository.
//!
//! `post_content` is the terminal write of the reconciliation algorithm: it
//! records the observed platform post, links it to the `GeneratedContent` the
//! fingerprint match identified (if any), and bumps the posting counters in
//! one transaction. `url` uniqueness is the idempotency guard : a redelivered
//! sync never double-counts a post.

use repurposer_core::models::Post;
use repurposer_core::{is_unique_violation, PipelineError};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `postContent`: insert the observed post, and if it matched a
    /// `GeneratedContent`, mark that content posted and
    /// bump `ContentAccount.times_posted` / `Content.times_posted` in the
    /// same transaction. Returns `(post, true)` on a fresh insert or `(post,
    /// false)` when `url` already existed — the caller treats the latter as a
    /// no-op rather than `Busy`.
    #[tracing::instrument(skip(self), fields(db.table = "posts", account_id = %account_id))]
    pub async fn post_content(
        &self,
        platform: &str,
        url: &str,
        account_id: Uuid,
        thumbnail_id: i64,
        content_id: Option<Uuid>,
        generated_content_id: Option<Uuid>,
        content_account_id: Option<Uuid>,
        is_tracked: bool,
        view_count: i64,
    ) -> Result<(Post, bool), PipelineError> {
        if let Some(existing) = self.get_by_url(url).await? {
            return Ok((existing, false));
        }

        let mut tx = self.pool.begin().await?;
        let post_id = Uuid::new_v4();
        let insert = sqlx::query_as::<_, Post>(
            "INSERT INTO posts \
                (id, platform, url, account_id, thumbnail_id, content_id, \
                 generated_content_id, is_tracked, view_count, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now()) \
             RETURNING id, platform, url, account_id, thumbnail_id, content_id, \
                       generated_content_id, is_tracked, view_count, created_at",
        )
        .bind(post_id)
        .bind(platform)
        .bind(url)
        .bind(account_id)
        .bind(thumbnail_id)
        .bind(content_id)
        .bind(generated_content_id)
        .bind(is_tracked)
        .bind(view_count)
        .fetch_one(&mut *tx)
        .await;

        let post = match insert {
            Ok(post) => post,
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await.ok();
                let existing = self
                    .get_by_url(url)
                    .await?
                    .ok_or_else(|| PipelineError::NotFound(format!("post {url}")))?;
                return Ok((existing, false));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(gc_id) = generated_content_id {
            sqlx::query("UPDATE generated_content SET is_posted = true WHERE id = $1")
                .bind(gc_id)
                .execute(&mut *tx)
                .await?;
        }
        if let Some(ca_id) = content_account_id {
            sqlx::query(
                "UPDATE content_accounts SET times_posted = times_posted + 1 WHERE id = $1",
            )
            .bind(ca_id)
            .execute(&mut *tx)
            .await?;
        }
        if let Some(c_id) = content_id {
            sqlx::query("UPDATE contents SET times_posted = times_posted + 1 WHERE id = $1")
                .bind(c_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok((post, true))
    }

    #[tracing::instrument(skip(self), fields(db.table = "posts"))]
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Post>, PipelineError> {
        let row = sqlx::query_as::<_, Post>(
            "SELECT id, platform, url, account_id, thumbnail_id, content_id, \
             generated_content_id, is_tracked, view_count, created_at FROM posts WHERE url = $1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

}
