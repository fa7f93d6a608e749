//! `POST /accounts/:account_id/sync` — `syncPosts`.
//!
//! Acquires single-flight synchronously (so a concurrent call gets `BUSY` in
//! its response rather than silently racing), then spawns the matching work
//! itself in the background — "returns immediately".

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use repurposer_core::models::AccountSyncStatus;
use repurposer_pipeline::PostReconciler;
use uuid::Uuid;

use crate::error::ApiError;

pub async fn sync_posts(
    State(reconciler): State<PostReconciler>,
    Path(account_id): Path<Uuid>,
) -> Result<(StatusCode, Json<AccountSyncStatus>), ApiError> {
    let sync = reconciler.start(account_id).await?;

    let background = reconciler.clone();
    let sync_for_task = sync.clone();
    tokio::spawn(async move {
        if let Err(e) = background.run(account_id, sync_for_task).await {
            tracing::error!(account_id = %account_id, error = %e, "post sync failed");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(sync)))
}
