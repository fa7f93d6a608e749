//! Wires every repository and pipeline component into the `AppState` the six
//! handlers share: one function building every service from a pool and a
//! config.
//!
//! The render engine, social media gateway, and fingerprint engine are
//! external collaborators this process doesn't own; this wiring plugs in the
//! placeholder implementations from `repurposer_core::hooks` until a real
//! deployment supplies its own.

use std::sync::Arc;

use repurposer_core::{HashingFingerprintEngine, NoOpRenderEngine, NoOpSocialMediaGateway, PipelineConfig};
use repurposer_db::{
    AccountRepository, ContentAccountRepository, ContentRepository, GeneratedContentRepository,
    LockRepository, PostRepository, RunRepository, SyncStatusRepository, TextOverlayRepository,
};
use repurposer_infra::{EventBus, RecoveryJobRunner};
use repurposer_pipeline::{
    Dispatcher, EventStream, FingerprintCache, LockRegistry, PostReconciler, RecoveryScheduler,
    RenderWorkerHook, RunTracker, SelectionPlanner, SyncStatusTracker,
};
use repurposer_worker::{RenderTaskRepository, TaskQueue, TaskQueueConfig};
use sqlx::PgPool;

use crate::state::AppState;

pub struct Services {
    pub state: Arc<AppState>,
    pub task_queue: TaskQueue,
    pub recovery: RecoveryJobRunner,
}

pub async fn initialize_services(config: &PipelineConfig, pool: PgPool) -> anyhow::Result<Services> {
    let accounts = AccountRepository::new(pool.clone());
    let contents = ContentRepository::new(pool.clone());
    let content_accounts = ContentAccountRepository::new(pool.clone());
    let generated_content = GeneratedContentRepository::new(pool.clone());
    let locks_repo = LockRepository::new(pool.clone());
    let runs_repo = RunRepository::new(pool.clone());
    let posts = PostRepository::new(pool.clone());
    let sync_status_repo = SyncStatusRepository::new(pool.clone());
    let text_overlays = TextOverlayRepository::new(pool.clone());
    let render_tasks = RenderTaskRepository::new(pool.clone());

    let locks = LockRegistry::new(locks_repo);
    let runs = RunTracker::new(runs_repo, LockRepository::new(pool.clone()));
    let events = EventStream::new(EventBus::new());
    let planner = SelectionPlanner::new(content_accounts.clone(), config.clone());

    let render_engine: Arc<dyn repurposer_core::RenderEngine> = Arc::new(NoOpRenderEngine);
    let render_hook: Arc<dyn repurposer_worker::RenderTaskHook> = Arc::new(RenderWorkerHook::new(
        render_engine,
        runs.clone(),
        generated_content.clone(),
        events.clone(),
    ));

    let task_queue = TaskQueue::new(
        render_tasks,
        TaskQueueConfig {
            max_workers: config.task_queue_max_workers,
            poll_interval_ms: config.task_queue_poll_interval_ms,
            max_retries: config.task_queue_max_retries,
            stale_task_reap_interval_secs: config.task_queue_stale_task_reap_interval_secs,
            stale_task_grace_period_secs: config.task_queue_stale_task_grace_period_secs,
        },
        Arc::downgrade(&render_hook),
        Some(pool.clone()),
    );

    let dispatcher = Dispatcher::new(
        accounts.clone(),
        contents,
        content_accounts,
        text_overlays,
        generated_content.clone(),
        locks.clone(),
        runs.clone(),
        planner,
        task_queue.clone(),
        events.clone(),
    );

    let sync_status = SyncStatusTracker::new(sync_status_repo);
    if let Err(e) = sync_status.fail_stale_active(chrono::Utc::now()).await {
        tracing::error!(error = %e, "startup sync-status reconciliation failed");
    }
    let fingerprint_engine: Arc<dyn repurposer_core::FingerprintEngine> =
        Arc::new(HashingFingerprintEngine);
    let fingerprints = FingerprintCache::new(
        fingerprint_engine,
        std::time::Duration::from_secs(config.fingerprint_cache_ttl_secs),
    );
    let gateway: Arc<dyn repurposer_core::SocialMediaGateway> = Arc::new(NoOpSocialMediaGateway);

    let reconciler = PostReconciler::new(
        accounts,
        generated_content,
        posts,
        sync_status,
        fingerprints,
        gateway,
        events.clone(),
        config.clone(),
    );

    let recovery = RecoveryScheduler::new(locks, runs.clone(), config.clone());
    if let Err(e) = recovery.purge_orphaned_locks().await {
        tracing::error!(error = %e, "startup orphan-lock purge failed");
    }
    let recovery_for_expired = recovery.clone();
    let recovery_for_stuck = recovery.clone();
    let recovery_runner = RecoveryJobRunner::spawn(
        move || {
            let recovery = recovery_for_expired.clone();
            Box::pin(async move { recovery.purge_expired_locks().await.map_err(anyhow::Error::from) })
        },
        std::time::Duration::from_secs(config.recovery_expired_lock_interval_secs),
        move || {
            let recovery = recovery_for_stuck.clone();
            Box::pin(async move { recovery.fix_stuck_runs().await.map_err(anyhow::Error::from) })
        },
        std::time::Duration::from_secs(config.recovery_stuck_run_interval_secs),
    );

    let state = Arc::new(AppState {
        dispatcher,
        runs,
        reconciler,
        events,
        config: config.clone(),
    });

    Ok(Services {
        state,
        task_queue,
        recovery: recovery_runner,
    })
}
