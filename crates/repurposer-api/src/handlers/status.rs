//! `GET /accounts/:account_id/content/active`, `/latest`, `/history`.

use axum::extract::{Path, Query, State};
use axum::Json;
use repurposer_core::models::{AccountGenerationStatus, ContentType};
use repurposer_core::PipelineError;
use repurposer_pipeline::RunTracker;
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ContentTypeQuery {
    pub content_type: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

const DEFAULT_HISTORY_LIMIT: i64 = 50;

pub async fn get_active_status(
    State(runs): State<RunTracker>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<ContentTypeQuery>,
) -> Result<Json<Option<AccountGenerationStatus>>, ApiError> {
    let content_type = parse_content_type(&query.content_type)?;
    let run = runs.get_active(account_id, content_type).await?;
    Ok(Json(run))
}

pub async fn get_latest_status(
    State(runs): State<RunTracker>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<ContentTypeQuery>,
) -> Result<Json<Option<AccountGenerationStatus>>, ApiError> {
    let content_type = parse_content_type(&query.content_type)?;
    let run = runs.get_latest(account_id, content_type).await?;
    Ok(Json(run))
}

/// `getHistory(account_id, limit)`: all content types, sorted by `started_at`
/// desc.
pub async fn get_history(
    State(runs): State<RunTracker>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<AccountGenerationStatus>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let history = runs.get_history(account_id, limit).await?;
    Ok(Json(history))
}

fn parse_content_type(raw: &str) -> Result<ContentType, PipelineError> {
    ContentType::from_str(raw).map_err(|e| PipelineError::InvalidInput(e.to_string()))
}
