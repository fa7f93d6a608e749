//! Render task queue table.
//!
//! One row per dispatched render task. `claim_next_task` is the `FOR UPDATE
//! SKIP LOCKED` claiming pattern, so concurrent worker processes never
//! double-claim the same row.

use chrono::{DateTime, Utc};
use repurposer_core::models::RenderTaskRequest;
use repurposer_core::PipelineError;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "snake_case")]
pub enum RenderTaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl Display for RenderTaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RenderTaskStatus::Pending => write!(f, "pending"),
            RenderTaskStatus::Running => write!(f, "running"),
            RenderTaskStatus::Completed => write!(f, "completed"),
            RenderTaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RenderTaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RenderTaskStatus::Pending),
            "running" => Ok(RenderTaskStatus::Running),
            "completed" => Ok(RenderTaskStatus::Completed),
            "failed" => Ok(RenderTaskStatus::Failed),
            _ => Err(anyhow::anyhow!("invalid render task status: {s}")),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RenderTaskRow {
    pub id: Uuid,
    pub run_id: Uuid,
    pub payload: serde_json::Value,
    pub status: RenderTaskStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RenderTaskRow {
    pub fn request(&self) -> Result<RenderTaskRequest, PipelineError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| PipelineError::Unknown(anyhow::anyhow!("malformed render task payload: {e}")))
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

const COLUMNS: &str = "id, run_id, payload, status, retry_count, max_retries, result, \
     error_message, created_at, updated_at";

#[derive(Clone)]
pub struct RenderTaskRepository {
    pool: PgPool,
}

impl RenderTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, request), fields(db.table = "render_tasks", run_id = %request.run_id))]
    pub async fn submit(
        &self,
        request: &RenderTaskRequest,
        max_retries: i32,
    ) -> Result<Uuid, PipelineError> {
        let id = Uuid::new_v4();
        let payload = serde_json::to_value(request)
            .map_err(|e| PipelineError::Unknown(anyhow::anyhow!("failed to encode render task: {e}")))?;
        sqlx::query(
            "INSERT INTO render_tasks \
                (id, run_id, payload, status, retry_count, max_retries, result, \
                 error_message, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 0, $5, NULL, NULL, now(), now())",
        )
        .bind(id)
        .bind(request.run_id)
        .bind(payload)
        .bind(RenderTaskStatus::Pending)
        .bind(max_retries)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    #[tracing::instrument(skip(self), fields(db.table = "render_tasks"))]
    pub async fn claim_next_task(&self) -> Result<Option<RenderTaskRow>, PipelineError> {
        let row = sqlx::query_as::<_, RenderTaskRow>(&format!(
            "UPDATE render_tasks SET status = $1, updated_at = now() \
             WHERE id = (
                 SELECT id FROM render_tasks \
                 WHERE status = $2 \
                 ORDER BY created_at ASC \
                 LIMIT 1 FOR UPDATE SKIP LOCKED
             ) \
             RETURNING {COLUMNS}"
        ))
        .bind(RenderTaskStatus::Running)
        .bind(RenderTaskStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self, result), fields(db.table = "render_tasks", task_id = %task_id))]
    pub async fn mark_completed(
        &self,
        task_id: Uuid,
        result: serde_json::Value,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE render_tasks SET status = $1, result = $2, updated_at = now() WHERE id = $3",
        )
        .bind(RenderTaskStatus::Completed)
        .bind(result)
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "render_tasks", task_id = %task_id))]
    pub async fn mark_failed(&self, task_id: Uuid, error_message: &str) -> Result<(), PipelineError> {
        sqlx::query(
            "UPDATE render_tasks SET status = $1, error_message = $2, updated_at = now() WHERE id = $3",
        )
        .bind(RenderTaskStatus::Failed)
        .bind(error_message)
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reschedules for retry (`running` -> `pending`) and bumps
    /// `retry_count`.
    #[tracing::instrument(skip(self), fields(db.table = "render_tasks", task_id = %task_id))]
    pub async fn increment_retry(&self, task_id: Uuid) -> Result<RenderTaskRow, PipelineError> {
        let row = sqlx::query_as::<_, RenderTaskRow>(&format!(
            "UPDATE render_tasks SET status = $1, retry_count = retry_count + 1, updated_at = now() \
             WHERE id = $2 RETURNING {COLUMNS}"
        ))
        .bind(RenderTaskStatus::Pending)
        .bind(task_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Recovers rows stuck `running` past `grace_period_secs` back to
    /// `pending` so a crashed worker doesn't strand them forever.
    #[tracing::instrument(skip(self), fields(db.table = "render_tasks"))]
    pub async fn reap_stale_running_tasks(&self, grace_period_secs: i64) -> Result<u64, PipelineError> {
        let result = sqlx::query(
            "UPDATE render_tasks SET status = $1, updated_at = now() \
             WHERE status = $2 AND updated_at < now() - ($3 || ' seconds')::interval",
        )
        .bind(RenderTaskStatus::Pending)
        .bind(RenderTaskStatus::Running)
        .bind(grace_period_secs.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_display_and_fromstr() {
        for status in [
            RenderTaskStatus::Pending,
            RenderTaskStatus::Running,
            RenderTaskStatus::Completed,
            RenderTaskStatus::Failed,
        ] {
            let parsed: RenderTaskStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
