//! Dispatcher.
//!
//! Consumes a planned selection: submits `video` items to the async render
//! task queue, and executes `story`/`slideshow` items inline under the same
//! counter contract the render worker hook uses for async completions. Precondition failures
//! (platform, posting goal, `quantity <= 0`) are rejected before the lock is
//! ever acquired; everything past that point drives the run to a terminal
//! state and releases the lock rather than leaving it stranded.

use rand::Rng;
use repurposer_core::models::{
    Account, AccountGenerationStatus, Content, ContentFile, ContentType, RenderTaskRequest,
};
use repurposer_core::PipelineError;
use repurposer_db::db::generated_content_repository::GeneratedContentFileInput;
use repurposer_db::{AccountRepository, ContentAccountRepository, ContentRepository, GeneratedContentRepository, TextOverlayRepository};
use repurposer_worker::TaskQueue;
use uuid::Uuid;

use crate::event_stream::EventStream;
use crate::lock_registry::LockRegistry;
use crate::run_tracker::RunTracker;
use crate::selection_planner::{PlannedSelection, SelectionPlanner};

/// `generate(GenerateContentRequest{account_id, type, quantity})`.
#[derive(Debug, Clone, Copy)]
pub struct GenerateContentRequest {
    pub account_id: Uuid,
    pub content_type: ContentType,
    pub quantity: i32,
}

#[derive(Clone)]
pub struct Dispatcher {
    accounts: AccountRepository,
    contents: ContentRepository,
    content_accounts: ContentAccountRepository,
    text_overlays: TextOverlayRepository,
    generated_content: GeneratedContentRepository,
    locks: LockRegistry,
    runs: RunTracker,
    planner: SelectionPlanner,
    task_queue: TaskQueue,
    events: EventStream,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accounts: AccountRepository,
        contents: ContentRepository,
        content_accounts: ContentAccountRepository,
        text_overlays: TextOverlayRepository,
        generated_content: GeneratedContentRepository,
        locks: LockRegistry,
        runs: RunTracker,
        planner: SelectionPlanner,
        task_queue: TaskQueue,
        events: EventStream,
    ) -> Self {
        Self {
            accounts,
            contents,
            content_accounts,
            text_overlays,
            generated_content,
            locks,
            runs,
            planner,
            task_queue,
            events,
        }
    }

    /// "Algorithm", steps 1-8.
    #[tracing::instrument(skip(self, request), fields(account_id = %request.account_id, content_type = %request.content_type, quantity = request.quantity))]
    pub async fn generate(
        &self,
        request: GenerateContentRequest,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        if request.quantity <= 0 {
            return Err(PipelineError::InvalidInput(
                "quantity must be positive".to_string(),
            ));
        }

        let account = self
            .accounts
            .get(request.account_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("account {}", request.account_id)))?;

        // Step 1: preconditions validated before any lock is taken.
        self.planner
            .check_preconditions(&account, request.content_type, request.quantity)
            .await?;

        // Step 2.
        let lock_id = self.locks.acquire(account.id, request.content_type).await?;

        // Step 3.
        let run = match self
            .runs
            .create_run(account.id, request.content_type, request.quantity)
            .await
        {
            Ok(run) => run,
            Err(e) => {
                self.locks.release(lock_id).await.ok();
                return Err(e);
            }
        };
        self.events.publish_run_created(&run);

        // Step 4.
        if let Err(e) = self.runs.set_lock_id(run.id, lock_id).await {
            self.locks.release(lock_id).await.ok();
            return Err(e);
        }

        // Step 5.
        if !request.content_type.has_generation_strategy() {
            let err = PipelineError::UnsupportedType(format!(
                "{} has no generation strategy",
                request.content_type
            ));
            return self.fail_all(run.id, request.quantity, "unsupported_type", err).await;
        }

        // Step 6.
        let plan = self
            .planner
            .plan(&account, request.content_type, request.quantity)
            .await?;

        if plan.is_empty() {
            let err = PipelineError::NoContentAvailable {
                account_id: account.id,
                content_type: request.content_type.to_string(),
            };
            return self.fail_all(run.id, request.quantity, "no_content_available", err).await;
        }

        let run = if (plan.len() as i32) < request.quantity {
            let updated = self.runs.update_total_requested(run.id, plan.len() as i32).await?;
            self.events.publish_run_updated(&updated);
            updated
        } else {
            run
        };

        // Step 7.
        let mut any_success = false;
        let mut first_error: Option<PipelineError> = None;
        for selection in &plan {
            match self
                .dispatch_one(&account, request.content_type, run.id, *selection)
                .await
            {
                Ok(()) => any_success = true,
                Err(e) => {
                    tracing::warn!(
                        run_id = %run.id,
                        content_account_id = %selection.content_account_id,
                        error = %e,
                        "dispatch item failed"
                    );
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        let mut final_run = self.runs.get(run.id).await?;
        if final_run.status.is_terminal() {
            final_run = self.runs.complete(run.id).await?;
        }
        self.events.publish_run_updated(&final_run);

        // Step 8.
        if !any_success {
            if let Some(err) = first_error {
                return Err(err);
            }
        }
        Ok(final_run)
    }

    /// Marks all `quantity` items failed with `code`, completes the run
    /// (releasing its lock), and surfaces `err`.
    async fn fail_all(
        &self,
        run_id: Uuid,
        quantity: i32,
        code: &str,
        err: PipelineError,
    ) -> Result<AccountGenerationStatus, PipelineError> {
        self.runs.increment_failed(run_id, quantity).await?;
        self.runs.set_error_code(run_id, code, Some(&err.to_string())).await?;
        let run = self.runs.complete(run_id).await?;
        self.events.publish_run_updated(&run);
        Err(err)
    }

    async fn dispatch_one(
        &self,
        account: &Account,
        content_type: ContentType,
        run_id: Uuid,
        selection: PlannedSelection,
    ) -> Result<(), PipelineError> {
        let resolved = self.contents.get_with_files(selection.content_id).await?;
        let files = match resolved {
            Some((_, files)) if !files.is_empty() => files,
            _ => {
                self.rollback(selection).await;
                // Video failures at this step surface only through the
                // aggregate dispatch error; the item never entered the
                // queued/processing buckets so there is nothing to unwind
                // there for that type.
                if content_type != ContentType::Video {
                    self.runs.increment_failed(run_id, 1).await.ok();
                }
                return Err(PipelineError::NoContentFiles {
                    content_id: selection.content_id,
                });
            }
        };
        let content = self
            .contents
            .get(selection.content_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("content {}", selection.content_id)))?;

        let text_overlay = self.resolve_text_overlay(account, &content).await?;

        match content_type {
            ContentType::Video => {
                self.dispatch_video(account, run_id, selection, &content, &files, text_overlay)
                    .await
            }
            ContentType::Story | ContentType::Slideshow => {
                self.dispatch_inline(account, content_type, run_id, selection, &content, &files, text_overlay)
                    .await
            }
            ContentType::Image => Err(PipelineError::UnsupportedType(
                "image has no generation strategy".to_string(),
            )),
        }
    }

    /// step 7 "Determine text_overlay".
    async fn resolve_text_overlay(
        &self,
        account: &Account,
        content: &Content,
    ) -> Result<Option<(Uuid, String)>, PipelineError> {
        if !content.use_overlays || account.role.is_main() {
            return Ok(None);
        }
        let overlays = self.text_overlays.list_for_account(account.id).await?;
        if overlays.is_empty() {
            return Ok(None);
        }
        let idx = rand::rng().random_range(0..overlays.len());
        let picked = &overlays[idx];
        Ok(Some((picked.id, picked.text.clone())))
    }

    async fn dispatch_video(
        &self,
        account: &Account,
        run_id: Uuid,
        selection: PlannedSelection,
        content: &Content,
        files: &[ContentFile],
        text_overlay: Option<(Uuid, String)>,
    ) -> Result<(), PipelineError> {
        let content_account = self
            .content_accounts
            .get(selection.content_account_id)
            .await?
            .ok_or_else(|| {
                PipelineError::NotFound(format!("content account {}", selection.content_account_id))
            })?;

        let use_mirror = content.use_mirror && content_account.times_generated % 2 == 0;
        let (text_overlay_id, text_overlay_text) = match text_overlay {
            Some((id, text)) => (Some(id), Some(text)),
            None => (None, None),
        };

        let request = RenderTaskRequest {
            run_id,
            file_id: files[0].file_id,
            account_id: account.id,
            content_id: content.id,
            content_account_id: selection.content_account_id,
            content_type: ContentType::Video,
            text_overlay: text_overlay_text,
            text_overlay_id,
            main_account: account.role.is_main(),
            use_mirror,
            use_overlays: text_overlay_id.is_some(),
        };

        match self.task_queue.submit_task(&request).await {
            Ok(_task_id) => {
                self.runs.increment_queued(run_id, 1).await?;
                Ok(())
            }
            Err(e) => {
                self.rollback(selection).await;
                self.runs.increment_failed(run_id, 1).await.ok();
                Err(PipelineError::TaskSubmitFailure(e.to_string()))
            }
        }
    }

    async fn dispatch_inline(
        &self,
        account: &Account,
        content_type: ContentType,
        run_id: Uuid,
        selection: PlannedSelection,
        content: &Content,
        files: &[ContentFile],
        text_overlay: Option<(Uuid, String)>,
    ) -> Result<(), PipelineError> {
        self.runs.increment_queued(run_id, 1).await?;
        self.runs.increment_processing(run_id, 1).await?;

        let file = &files[0];
        let used_overlay = text_overlay.is_some();
        let result = self
            .generated_content
            .insert_if_absent(
                content_type,
                account.id,
                content.id,
                selection.content_account_id,
                content.use_mirror,
                used_overlay,
                GeneratedContentFileInput {
                    file_id: file.file_id,
                    thumbnail_id: file.thumbnail_id,
                    file_hash: file.etag.clone(),
                    thumbnail_hash: file.etag.clone(),
                    is_aliased: true,
                },
            )
            .await;

        match result {
            Ok(_) => {
                self.runs.increment_completed(run_id, 1).await?;
                Ok(())
            }
            Err(e) => {
                self.rollback(selection).await;
                self.runs.increment_failed(run_id, 1).await.ok();
                Err(e)
            }
        }
    }

    async fn rollback(&self, selection: PlannedSelection) {
        if let Err(e) = self
            .planner
            .rollback(selection.content_account_id, selection.content_id)
            .await
        {
            tracing::warn!(
                content_account_id = %selection.content_account_id,
                error = %e,
                "failed to roll back reservation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_content_request_is_copy() {
        let request = GenerateContentRequest {
            account_id: Uuid::new_v4(),
            content_type: ContentType::Video,
            quantity: 2,
        };
        let copied = request;
        assert_eq!(request.account_id, copied.account_id);
    }
}
