//! `POST /accounts/:account_id/content` — `generate`.

use axum::extract::{Path, State};
use axum::Json;
use repurposer_core::models::{AccountGenerationStatus, ContentType};
use repurposer_pipeline::{Dispatcher, GenerateContentRequest};
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub content_type: String,
    pub quantity: i32,
}

pub async fn generate(
    State(dispatcher): State<Dispatcher>,
    Path(account_id): Path<Uuid>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<AccountGenerationStatus>, ApiError> {
    let content_type = ContentType::from_str(&body.content_type)
        .map_err(|e| repurposer_core::PipelineError::InvalidInput(e.to_string()))?;

    let run = dispatcher
        .generate(GenerateContentRequest {
            account_id,
            content_type,
            quantity: body.quantity,
        })
        .await?;

    Ok(Json(run))
}
