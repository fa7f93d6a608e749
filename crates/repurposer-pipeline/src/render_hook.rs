//! Render Worker Hook.
//!
//! Implements [`repurposer_worker::RenderTaskHook`] so the worker crate can
//! call back into this crate's business logic without depending on it. The
//! worker invokes this once per delivery attempt, including redeliveries
//! after a retry backoff — the `(content_account_id, file_hash)` idempotency
//! guard in [`GeneratedContentRepository::insert_if_absent`] and the retry-
//! after-fail reconciliation rule are what make that safe.

use async_trait::async_trait;
use repurposer_core::models::{RenderTaskOutcome, RenderTaskRequest, RenderTaskSuccess};
use repurposer_core::RenderEngine;
use repurposer_db::db::generated_content_repository::GeneratedContentFileInput;
use repurposer_db::GeneratedContentRepository;
use repurposer_worker::RenderTaskHook;
use std::sync::Arc;

use crate::event_stream::EventStream;
use crate::run_tracker::RunTracker;

pub struct RenderWorkerHook {
    engine: Arc<dyn RenderEngine>,
    runs: RunTracker,
    generated_content: GeneratedContentRepository,
    events: EventStream,
}

impl RenderWorkerHook {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        runs: RunTracker,
        generated_content: GeneratedContentRepository,
        events: EventStream,
    ) -> Self {
        Self {
            engine,
            runs,
            generated_content,
            events,
        }
    }

    /// Best-effort `incrementProcessingByAccount`; a miss (no active run —
    /// e.g. this delivery races a run that already completed) is absorbed
    /// silently.
    async fn mark_processing_started(&self, request: &RenderTaskRequest) {
        match self
            .runs
            .increment_processing_by_account(request.account_id, request.content_type)
            .await
        {
            Ok(Some(run)) => self.events.publish_run_updated(&run),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(account_id = %request.account_id, error = %e, "failed to mark render task as processing");
            }
        }
    }

    async fn record_success(
        &self,
        request: &RenderTaskRequest,
        success: &RenderTaskSuccess,
    ) -> anyhow::Result<()> {
        let (_gc, inserted) = self
            .generated_content
            .insert_if_absent(
                request.content_type,
                request.account_id,
                request.content_id,
                request.content_account_id,
                request.use_mirror,
                request.use_overlays,
                GeneratedContentFileInput {
                    file_id: success.rendered_file_id,
                    thumbnail_id: success.thumbnail_file_id,
                    file_hash: success.video_hash.clone(),
                    thumbnail_hash: success.thumbnail_hash.clone(),
                    is_aliased: false,
                },
            )
            .await?;

        if !inserted {
            // Redelivered success for a task this hook already recorded.
            return Ok(());
        }

        let run = self.runs.get(request.run_id).await?;
        let updated = if run.total_processing == 0 && run.total_failed > 0 {
            // A prior (retried) attempt already recorded this item as
            // failed before this success arrived; undo that and record it
 // as completed instead.
            self.runs.reconcile_retry_after_fail(request.run_id).await?
        } else {
            self.runs.increment_completed(request.run_id, 1).await?
        };

        let final_run = if updated.status.is_terminal() {
            self.runs.complete(request.run_id).await?
        } else {
            updated
        };
        self.events.publish_run_updated(&final_run);
        Ok(())
    }

    async fn record_failure(&self, request: &RenderTaskRequest, message: &str) -> anyhow::Result<()> {
        tracing::warn!(run_id = %request.run_id, content_account_id = %request.content_account_id, message, "render task attempt failed");
        let updated = self.runs.increment_failed(request.run_id, 1).await?;
        let final_run = if updated.status.is_terminal() {
            self.runs.complete(request.run_id).await?
        } else {
            updated
        };
        self.events.publish_run_updated(&final_run);
        Ok(())
    }
}

#[async_trait]
impl RenderTaskHook for RenderWorkerHook {
    #[tracing::instrument(skip(self, request), fields(run_id = %request.run_id, content_account_id = %request.content_account_id))]
    async fn handle_render_task(
        self: Arc<Self>,
        request: &RenderTaskRequest,
    ) -> anyhow::Result<RenderTaskOutcome> {
        self.mark_processing_started(request).await;

        let render_result = self
            .engine
            .render(request.file_id, request.use_mirror, request.text_overlay.as_deref())
            .await;

        let outcome = match render_result {
            Ok(result) => {
                let success = RenderTaskSuccess {
                    rendered_file_id: result.rendered_blob_id,
                    thumbnail_file_id: result.thumbnail_blob_id,
                    video_hash: result.video_hash,
                    thumbnail_hash: result.thumbnail_hash,
                    processing_time_ms: 0,
                };
                if let Err(e) = self.record_success(request, &success).await {
                    tracing::error!(run_id = %request.run_id, error = %e, "failed to record render success");
                    return Err(e);
                }
                RenderTaskOutcome::Success(success)
            }
            Err(e) => {
                let message = e.to_string();
                self.record_failure(request, &message).await?;
                RenderTaskOutcome::Failure { message }
            }
        };

        Ok(outcome)
    }
}
