//! Content repository.

use repurposer_core::models::{Content, ContentFile};
use repurposer_core::PipelineError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "contents"))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Content>, PipelineError> {
        let row = sqlx::query_as::<_, Content>(
            "SELECT id, client_id, content_type, enabled, use_mirror, use_overlays, \
             times_generated, times_posted, last_generated_at, created_at \
             FROM contents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// "Resolve populated Content (with ContentFiles)".
    /// Returns `None` if the content has zero files — `NoContentFiles`
    /// territory handled by the caller.
    #[tracing::instrument(skip(self), fields(db.table = "contents"))]
    pub async fn get_with_files(
        &self,
        id: Uuid,
    ) -> Result<Option<(Content, Vec<ContentFile>)>, PipelineError> {
        let Some(content) = self.get(id).await? else {
            return Ok(None);
        };
        let files = sqlx::query_as::<_, ContentFile>(
            "SELECT id, content_id, position, file_id, thumbnail_id, etag \
             FROM content_files WHERE content_id = $1 ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some((content, files)))
    }

    /// Deletion cascades to `ContentFiles` and all dependent
    /// `GeneratedContents`. The cascade
    /// itself is expressed as `ON DELETE CASCADE` in the schema; this method
    /// is the entry point callers use so the cascade is always exercised
    /// through one code path.
    #[tracing::instrument(skip(self), fields(db.table = "contents"))]
    pub async fn delete(&self, id: Uuid) -> Result<(), PipelineError> {
        sqlx::query("DELETE FROM contents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
