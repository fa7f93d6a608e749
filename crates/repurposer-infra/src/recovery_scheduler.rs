//! Background wiring for Recovery.
//!
//! Runs the orphan-lock purge once at startup, then the expired-lock purge
//! and the stuck-run fixer on their own configurable intervals, each as an
//! independent `tokio::spawn` loop so a panic or persistent error in one job
//! never stops the other: the same `tokio::time::interval` + `tokio::select!`
//! + `mpsc` shutdown-channel shape used elsewhere in this workspace for
//! background jobs, generalized from one job to several running
//! independently.
//!
//! This crate has no dependency on `repurposer-pipeline`, so the jobs
//! themselves are injected as `Fn -> Future` closures rather than typed
//! against `repurposer_pipeline::RecoveryScheduler` directly — the caller
//! (the API's startup wiring) supplies the closures bound to its own
//! `RecoveryScheduler` instance.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Drives the two periodic recovery jobs; owns the shutdown channels for both
/// background loops.
pub struct RecoveryJobRunner {
    expired_lock_shutdown: mpsc::Sender<()>,
    stuck_run_shutdown: mpsc::Sender<()>,
}

impl RecoveryJobRunner {
    /// Spawns both periodic jobs. Callers run the orphan-lock purge
    /// themselves, once, before constructing this.
    pub fn spawn(
        expired_lock_purge: impl Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<u64>> + Send>>
            + Send
            + Sync
            + 'static,
        expired_lock_interval: Duration,
        stuck_run_fix: impl Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<usize>> + Send>>
            + Send
            + Sync
            + 'static,
        stuck_run_interval: Duration,
    ) -> Self {
        let (expired_lock_shutdown, expired_lock_rx) = mpsc::channel(1);
        let (stuck_run_shutdown, stuck_run_rx) = mpsc::channel(1);

        tokio::spawn(Self::run_loop(
            "expired_lock_purge",
            expired_lock_interval,
            move || {
                let fut = expired_lock_purge();
                Box::pin(async move { fut.await.map(|_| ()) }) as Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
            },
            expired_lock_rx,
        ));

        tokio::spawn(Self::run_loop(
            "stuck_run_fixer",
            stuck_run_interval,
            move || {
                let fut = stuck_run_fix();
                Box::pin(async move { fut.await.map(|_| ()) }) as Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
            },
            stuck_run_rx,
        ));

        Self {
            expired_lock_shutdown,
            stuck_run_shutdown,
        }
    }

    async fn run_loop(
        name: &'static str,
        period: Duration,
        job: impl Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut ticker = interval(period);
        tracing::info!(job = name, period_secs = period.as_secs(), "recovery job started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = job().await {
                        tracing::error!(job = name, error = %e, "recovery job iteration failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(job = name, "recovery job shutting down");
                    break;
                }
            }
        }
    }

    pub async fn shutdown(&self) {
        let _ = self.expired_lock_shutdown.send(()).await;
        let _ = self.stuck_run_shutdown.send(()).await;
    }
}
