//! TextOverlay repository.

use repurposer_core::models::TextOverlay;
use repurposer_core::PipelineError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct TextOverlayRepository {
    pool: PgPool,
}

impl TextOverlayRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Overlays assigned to the account, for the dispatcher's uniform-random pick when
    /// `content.use_overlays` is true and the account is not `main`
    #[tracing::instrument(skip(self), fields(db.table = "text_overlays"))]
    pub async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<TextOverlay>, PipelineError> {
        let rows = sqlx::query_as::<_, TextOverlay>(
            "SELECT id, account_id, text, created_at FROM text_overlays WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
