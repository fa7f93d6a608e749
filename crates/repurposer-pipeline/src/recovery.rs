//! RecoveryScheduler.
//!
//! Three independent jobs that repair the drift the rest of the pipeline
//! deliberately tolerates in exchange for throughput: an orphaned-lock purge
//! run once at startup, and an expired-lock purge plus a stuck-run fixer run
//! periodically by `repurposer-infra`'s recovery scheduler. Each job is
//! independent — a failure in one must never prevent the others from running,
//! so callers invoke them separately rather than through one combined entry
//! point.

use chrono::Utc;
use repurposer_core::models::{AccountGenerationStatus, RunCounters};
use repurposer_core::{PipelineConfig, PipelineError};
use uuid::Uuid;

use crate::lock_registry::LockRegistry;
use crate::run_tracker::RunTracker;

#[derive(Clone)]
pub struct RecoveryScheduler {
    locks: LockRegistry,
    runs: RunTracker,
    config: PipelineConfig,
}

impl RecoveryScheduler {
    pub fn new(locks: LockRegistry, runs: RunTracker, config: PipelineConfig) -> Self {
        Self { locks, runs, config }
    }

    /// Job 1, run once at startup: a lock is
    /// orphaned if no active run exists on its `(account, content_type)`, or
    /// the active run's `lock_id` doesn't match this lock (a stale lock left
    /// behind by a crash between `acquire` and `setLockId`).
    #[tracing::instrument(skip(self))]
    pub async fn purge_orphaned_locks(&self) -> Result<u64, PipelineError> {
        let locks = self.locks.list_all().await?;
        let mut orphaned = Vec::new();

        for lock in &locks {
            let active = self.runs.get_active(lock.account_id, lock.content_type).await?;
            let is_orphaned = match active {
                None => true,
                Some(run) => run.lock_id != Some(lock.lock_id),
            };
            if is_orphaned {
                orphaned.push(lock.lock_id);
            }
        }

        if orphaned.is_empty() {
            return Ok(0);
        }
        let deleted = self.locks.delete_many(&orphaned).await?;
        tracing::info!(deleted, "purged orphaned generation locks");
        Ok(deleted)
    }

    /// Job 2, periodic: `locked_at` older than
    /// the configured expiry is deleted unconditionally, independent of
    /// whether a run still references it — a lock this old outlived any run
    /// that could legitimately hold it.
    #[tracing::instrument(skip(self))]
    pub async fn purge_expired_locks(&self) -> Result<u64, PipelineError> {
        let expiry = Utc::now() - chrono::Duration::hours(self.config.lock_expiry_hours as i64);
        let expired = self.locks.list_expired(expiry).await?;
        if expired.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = expired.iter().map(|lock| lock.lock_id).collect();
        let deleted = self.locks.delete_many(&ids).await?;
        tracing::info!(deleted, "purged expired generation locks");
        Ok(deleted)
    }

    /// Job 3, periodic: repairs runs whose
    /// `updated_at` has gone stale while still non-terminal.
    #[tracing::instrument(skip(self))]
    pub async fn fix_stuck_runs(&self) -> Result<usize, PipelineError> {
        let staleness = Utc::now() - chrono::Duration::seconds(self.config.stuck_run_staleness_secs);
        let stale_runs = self.runs.list_stale(staleness).await?;
        let mut fixed = 0;
        for run in &stale_runs {
            if self.fix_one_run(run).await? {
                fixed += 1;
            }
        }
        if fixed > 0 {
            tracing::info!(fixed, candidates = stale_runs.len(), "repaired stuck runs");
        }
        Ok(fixed)
    }

    /// three repair branches, in order.
    async fn fix_one_run(&self, run: &AccountGenerationStatus) -> Result<bool, PipelineError> {
        let c = run.counters();
        let finished = c.total_completed + c.total_failed;

        if finished >= c.total_requested {
            if !run.status.is_terminal() {
                self.runs.complete(run.id).await?;
                return Ok(true);
            }
            return Ok(false);
        }

        if c.total_processing == 0 && c.total_queued == 0 {
            let remainder = c.total_requested - finished;
            let repaired = RunCounters {
                total_failed: c.total_failed + remainder,
                ..c
            };
            self.runs.set_counters(run.id, repaired).await?;
            self.runs.complete(run.id).await?;
            return Ok(true);
        }

        let in_flight_sum = c.total_queued + c.total_processing + c.total_completed + c.total_failed;
        if in_flight_sum > c.total_requested {
            let repaired = Self::drain_excess_into_failed(c, in_flight_sum - c.total_requested);
            let updated = self.runs.set_counters(run.id, repaired).await?;
            if updated.status.is_terminal() {
                self.runs.complete(run.id).await?;
            }
            return Ok(true);
        }

        Ok(false)
    }

    /// Drift repair: move `excess` units from `processing` first, then
    /// `queued`, into `failed`, until the counters sum to `total_requested`
    /// again.
    fn drain_excess_into_failed(c: RunCounters, mut excess: i32) -> RunCounters {
        let mut repaired = c;
        let from_processing = excess.min(repaired.total_processing);
        repaired.total_processing -= from_processing;
        repaired.total_failed += from_processing;
        excess -= from_processing;

        let from_queued = excess.min(repaired.total_queued);
        repaired.total_queued -= from_queued;
        repaired.total_failed += from_queued;

        repaired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(requested: i32, queued: i32, processing: i32, completed: i32, failed: i32) -> RunCounters {
        RunCounters {
            total_requested: requested,
            total_queued: queued,
            total_processing: processing,
            total_completed: completed,
            total_failed: failed,
        }
    }

    #[test]
    fn drains_processing_before_queued() {
        let c = counters(5, 2, 3, 1, 1);
        let repaired = RecoveryScheduler::drain_excess_into_failed(c, 2);
        assert_eq!(repaired.total_processing, 1);
        assert_eq!(repaired.total_queued, 2);
        assert_eq!(repaired.total_failed, 3);
    }

    #[test]
    fn drains_into_queued_once_processing_exhausted() {
        let c = counters(3, 3, 1, 0, 0);
        let repaired = RecoveryScheduler::drain_excess_into_failed(c, 1);
        assert_eq!(repaired.total_processing, 0);
        assert_eq!(repaired.total_queued, 3);
        assert_eq!(repaired.total_failed, 1);
    }
}
