//! Render task queue: worker pool, LISTEN/NOTIFY, retry, submission.
//!
//! Narrowed to the single render-task payload this queue handles:
//! `compute_retry_backoff_seconds` and its exponential-with-cap shape, the
//! `FOR UPDATE SKIP LOCKED` claim + semaphore-bounded worker pool, the
//! LISTEN/NOTIFY wake-up alongside polling, and the stale-task reaper.
//!
//! Shutdown: [`TaskQueue::shutdown`] signals the pool to stop; it does not
//! wait for in-flight tasks.

use anyhow::Result;
use serde_json::json;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;

use repurposer_core::models::{RenderTaskOutcome, RenderTaskRequest};

use crate::hook::RenderTaskHook;
use crate::repository::{RenderTaskRepository, RenderTaskRow};

/// Channel name for PostgreSQL LISTEN/NOTIFY when a new render task is
/// created.
pub const RENDER_TASK_NOTIFY_CHANNEL: &str = "repurposer_new_render_task";

/// Maximum delay in seconds before retrying a failed render task.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Computes backoff in seconds for a given retry count (exponential with
/// cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(retry_count: i32) -> u64 {
    (2_u64.pow(retry_count as u32)).min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Clone)]
pub struct TaskQueueConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    pub max_retries: i32,
    /// Interval in seconds between runs of the stale task reaper.
    pub stale_task_reap_interval_secs: u64,
    /// Grace period in seconds added before reaping stale running tasks.
    pub stale_task_grace_period_secs: i64,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval_ms: 1000,
            max_retries: 3,
            stale_task_reap_interval_secs: 60,
            stale_task_grace_period_secs: 300,
        }
    }
}

pub struct TaskQueue {
    repository: RenderTaskRepository,
    config: TaskQueueConfig,
    shutdown_tx: mpsc::Sender<()>,
}

impl TaskQueue {
    /// Create a new `TaskQueue` with a weak reference to the render hook.
    ///
    /// If `pool` is `Some`, the worker uses PostgreSQL LISTEN/NOTIFY to wake
    /// immediately when a task is submitted, in addition to polling at
    /// `poll_interval_ms`. If `None`, only polling is used.
    pub fn new(
        repository: RenderTaskRepository,
        config: TaskQueueConfig,
        hook: Weak<dyn RenderTaskHook>,
        pool: Option<sqlx::PgPool>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let repo_clone = repository.clone();
        let config_clone = config.clone();

        tokio::spawn(async move {
            Self::worker_pool(repo_clone, config_clone, hook, shutdown_rx, pool).await;
        });

        Self {
            repository,
            config,
            shutdown_tx,
        }
    }

    /// Submit a render task to the queue.
    #[tracing::instrument(skip(self, request), fields(run_id = %request.run_id))]
    pub async fn submit_task(&self, request: &RenderTaskRequest) -> Result<uuid::Uuid> {
        let id = self
            .repository
            .submit(request, self.config.max_retries)
            .await
            .map_err(|e| anyhow::anyhow!("failed to submit render task: {e}"))?;
        tracing::info!(task_id = %id, run_id = %request.run_id, "Render task submitted to queue");
        Ok(id)
    }

    async fn worker_pool(
        repository: RenderTaskRepository,
        config: TaskQueueConfig,
        hook: Weak<dyn RenderTaskHook>,
        mut shutdown_rx: mpsc::Receiver<()>,
        pool: Option<sqlx::PgPool>,
    ) {
        let use_listen = pool.is_some();
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            listen_notify = use_listen,
            "Render task queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(16);
        if let Some(pool) = pool {
            let tx = notify_tx.clone();
            tokio::spawn(async move {
                loop {
                    match sqlx::postgres::PgListener::connect_with(&pool).await {
                        Ok(mut listener) => {
                            if let Err(e) = listener.listen(RENDER_TASK_NOTIFY_CHANNEL).await {
                                tracing::warn!(error = %e, "LISTEN failed, will retry");
                                sleep(Duration::from_secs(5)).await;
                                continue;
                            }
                            while listener.recv().await.is_ok() {
                                let _ = tx.send(()).await;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "PgListener connect failed, will retry");
                            sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            });
        }

        let (reaper_shutdown_tx, mut reaper_shutdown_rx) = mpsc::channel::<()>(1);
        if config.stale_task_reap_interval_secs > 0 {
            let repo_for_reaper = repository.clone();
            let reap_interval = Duration::from_secs(config.stale_task_reap_interval_secs);
            let grace_period = config.stale_task_grace_period_secs;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(reap_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = repo_for_reaper.reap_stale_running_tasks(grace_period).await {
                                tracing::error!(error = %e, "Stale render task reaper failed");
                            }
                        }
                        _ = reaper_shutdown_rx.recv() => break,
                    }
                }
            });
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Render task queue worker pool shutting down");
                    let _ = reaper_shutdown_tx.send(()).await;
                    break;
                }
                _ = notify_rx.recv() => {
                    Self::claim_and_dispatch_one(&repository, &semaphore, &hook).await;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch_one(&repository, &semaphore, &hook).await;
                }
            }
        }

        tracing::info!("Render task queue worker pool stopped");
    }

    async fn claim_and_dispatch_one(
        repository: &RenderTaskRepository,
        semaphore: &Arc<Semaphore>,
        hook: &Weak<dyn RenderTaskHook>,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("No workers available, skipping claim");
                return;
            }
        };

        match repository.claim_next_task().await {
            Ok(Some(task)) => {
                let repo = repository.clone();
                let hook = hook.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    Self::process_task(task, repo, hook).await;
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No render tasks available in queue");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim render task from queue");
            }
        }
    }

    #[tracing::instrument(skip(repository, hook), fields(task.id = %task.id, task.run_id = %task.run_id))]
    async fn process_task(task: RenderTaskRow, repository: RenderTaskRepository, hook: Weak<dyn RenderTaskHook>) {
        let request = match task.request() {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(task_id = %task.id, error = %e, "Malformed render task payload, marking failed");
                let _ = repository.mark_failed(task.id, &e.to_string()).await;
                return;
            }
        };

        let Some(hook) = hook.upgrade() else {
            tracing::error!(task_id = %task.id, "RenderTaskHook was dropped, cannot process task");
            return;
        };

        match hook.handle_render_task(&request).await {
            Ok(RenderTaskOutcome::Success(success)) => {
                let result = json!(success);
                if let Err(e) = repository.mark_completed(task.id, result).await {
                    tracing::error!(task_id = %task.id, error = %e, "Failed to mark render task completed");
                    return;
                }
                tracing::info!(task_id = %task.id, "Render task completed successfully");
            }
            Ok(RenderTaskOutcome::Failure { message }) => {
                Self::handle_failure(&task, &repository, &message).await;
            }
            Err(e) => {
                Self::handle_failure(&task, &repository, &e.to_string()).await;
            }
        }
    }

    async fn handle_failure(task: &RenderTaskRow, repository: &RenderTaskRepository, message: &str) {
        tracing::error!(
            task_id = %task.id,
            error = %message,
            retry_count = task.retry_count,
            max_retries = task.max_retries,
            "Render task execution failed"
        );

        if task.can_retry() {
            let backoff_seconds = compute_retry_backoff_seconds(task.retry_count);
            tracing::info!(
                task_id = %task.id,
                retry_count = task.retry_count + 1,
                backoff_seconds = backoff_seconds,
                "Scheduling render task retry"
            );
            if let Err(e) = repository.increment_retry(task.id).await {
                tracing::error!(task_id = %task.id, error = %e, "Failed to schedule retry");
            }
        } else if let Err(e) = repository.mark_failed(task.id, message).await {
            tracing::error!(task_id = %task.id, error = %e, "Failed to mark render task failed");
        }
    }

    /// Signals the worker pool to stop claiming new tasks and exit the main
    /// loop. Returns immediately; does not wait for in-flight tasks.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating render task queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl Clone for TaskQueue {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            config: self.config.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(0), 1);
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(10), MAX_RETRY_BACKOFF_SECS);
    }
}
