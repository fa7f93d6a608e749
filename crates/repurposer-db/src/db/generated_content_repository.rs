//! GeneratedContent repository.
//!
//! `insert_if_absent` is the idempotency guard against task redelivery : a
//! `(content_account_id, file_hash)` uniqueness check runs before insert so a
//! redelivered success never creates a duplicate row. `delete` honors the
//! aliasing rule: video files are exclusively owned and enqueue a blob delete
//! after commit; story/slideshow files alias a `ContentFile` blob and are
//! never deleted.

use repurposer_core::models::{ContentType, GeneratedContent, GeneratedContentFile};
use repurposer_core::PipelineError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct GeneratedContentRepository {
    pool: PgPool,
}

impl GeneratedContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// "Idempotency": guard by `(content_account_id, file_hash)` before
    /// insert. Returns the existing row, unchanged, if one already matches —
    /// the caller treats this the same as a fresh insert.
    #[tracing::instrument(skip(self, file), fields(db.table = "generated_content", content_account_id = %content_account_id))]
    pub async fn insert_if_absent(
        &self,
        content_type: ContentType,
        account_id: Uuid,
        content_id: Uuid,
        content_account_id: Uuid,
        used_mirror: bool,
        used_overlay: bool,
        file: GeneratedContentFileInput,
    ) -> Result<(GeneratedContent, bool), PipelineError> {
        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT gc.id FROM generated_content gc \
             JOIN generated_content_files gcf ON gcf.generated_content_id = gc.id \
             WHERE gc.content_account_id = $1 AND gcf.file_hash = $2 LIMIT 1",
        )
        .bind(content_account_id)
        .bind(&file.file_hash)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(existing_id) = existing {
            let gc = self
                .get(existing_id)
                .await?
                .ok_or_else(|| PipelineError::NotFound(format!("generated content {existing_id}")))?;
            return Ok((gc, false));
        }

        let mut tx = self.pool.begin().await?;
        let gc_id = Uuid::new_v4();
        let gc = sqlx::query_as::<_, GeneratedContent>(
            "INSERT INTO generated_content \
                (id, content_type, account_id, content_id, content_account_id, is_posted, \
                 used_mirror, used_overlay, created_at) \
             VALUES ($1, $2, $3, $4, $5, false, $6, $7, now()) \
             RETURNING id, content_type, account_id, content_id, content_account_id, is_posted, \
                       used_mirror, used_overlay, created_at",
        )
        .bind(gc_id)
        .bind(content_type)
        .bind(account_id)
        .bind(content_id)
        .bind(content_account_id)
        .bind(used_mirror)
        .bind(used_overlay)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO generated_content_files \
                (id, generated_content_id, file_id, thumbnail_id, file_hash, thumbnail_hash, is_aliased) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(gc_id)
        .bind(file.file_id)
        .bind(file.thumbnail_id)
        .bind(&file.file_hash)
        .bind(&file.thumbnail_hash)
        .bind(file.is_aliased)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((gc, true))
    }

    #[tracing::instrument(skip(self), fields(db.table = "generated_content"))]
    pub async fn get(&self, id: Uuid) -> Result<Option<GeneratedContent>, PipelineError> {
        let row = sqlx::query_as::<_, GeneratedContent>(
            "SELECT id, content_type, account_id, content_id, content_account_id, is_posted, \
             used_mirror, used_overlay, created_at FROM generated_content WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "generated_content_files"))]
    pub async fn files(&self, generated_content_id: Uuid) -> Result<Vec<GeneratedContentFile>, PipelineError> {
        let rows = sqlx::query_as::<_, GeneratedContentFile>(
            "SELECT id, generated_content_id, file_id, thumbnail_id, file_hash, thumbnail_hash, \
             is_aliased FROM generated_content_files WHERE generated_content_id = $1",
        )
        .bind(generated_content_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Unposted video `GeneratedContent` for an account, the candidate
    /// pool the post reconciler fingerprints against platform posts.
    #[tracing::instrument(skip(self), fields(db.table = "generated_content"))]
    pub async fn list_unposted_video(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<GeneratedContent>, PipelineError> {
        let rows = sqlx::query_as::<_, GeneratedContent>(
            "SELECT id, content_type, account_id, content_id, content_account_id, is_posted, \
             used_mirror, used_overlay, created_at FROM generated_content \
             WHERE account_id = $1 AND content_type = 'video' AND is_posted = false",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "generated_content"))]
    pub async fn mark_posted(&self, id: Uuid) -> Result<(), PipelineError> {
        sqlx::query("UPDATE generated_content SET is_posted = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletion cascades to files; the
    /// caller is responsible for enqueuing a blob delete only for rows whose
    /// files are `is_aliased = false` (video) — this method returns the blob
    /// ids that are safe to delete so the caller can fire that
    /// off after the DB commit.
    #[tracing::instrument(skip(self), fields(db.table = "generated_content"))]
    pub async fn delete(&self, id: Uuid) -> Result<Vec<i64>, PipelineError> {
        let owned_blobs: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT file_id, thumbnail_id FROM generated_content_files \
             WHERE generated_content_id = $1 AND is_aliased = false",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        sqlx::query("DELETE FROM generated_content WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let mut blob_ids = Vec::with_capacity(owned_blobs.len() * 2);
        for (file_id, thumbnail_id) in owned_blobs {
            blob_ids.push(file_id);
            blob_ids.push(thumbnail_id);
        }
        Ok(blob_ids)
    }
}

/// Input to [`GeneratedContentRepository::insert_if_absent`] describing the
/// single file row a render (video) or alias (story/slideshow) produces.
pub struct GeneratedContentFileInput {
    pub file_id: i64,
    pub thumbnail_id: i64,
    pub file_hash: String,
    pub thumbnail_hash: String,
    pub is_aliased: bool,
}
