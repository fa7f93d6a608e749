//! Account repository. Thin read access — accounts are created by the out-of-
//! scope external write path; the core only reads goals and platform/role for
//! dispatch decisions.

use repurposer_core::models::Account;
use repurposer_core::PipelineError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "accounts"))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Account>, PipelineError> {
        let row = sqlx::query_as::<_, Account>(
            "SELECT id, client_id, username, platform, role, video_goal, slideshow_goal, \
             story_goal, created_at, updated_at FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
