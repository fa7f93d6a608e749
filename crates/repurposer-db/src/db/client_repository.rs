//! Client repository. Read access used to check that a `Content` and the
//! `Account` it's being assigned to belong to the same client.

use repurposer_core::models::Client;
use repurposer_core::PipelineError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients"))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Client>, PipelineError> {
        let row = sqlx::query_as::<_, Client>("SELECT id, name, created_at FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
