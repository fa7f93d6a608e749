use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::ContentType;

/// The derived run-status state machine. Never written directly; always
/// recomputed from counters by [`derive_run_status`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queuing,
    Processing,
    Completed,
    Failed,
    Partial,
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RunStatus::Queuing => write!(f, "queuing"),
            RunStatus::Processing => write!(f, "processing"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Partial => write!(f, "partial"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queuing" => Ok(RunStatus::Queuing),
            "processing" => Ok(RunStatus::Processing),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "partial" => Ok(RunStatus::Partial),
            _ => Err(anyhow::anyhow!("invalid run status: {s}")),
        }
    }
}

impl RunStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Partial
        )
    }

    /// Statuses in which at most one run per `(account, content_type)` may
    /// exist.
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Queuing | RunStatus::Processing)
    }
}

/// The counter vector the derivation function reads. Kept as a standalone
/// type so it can be unit tested independent of the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub total_requested: i32,
    pub total_queued: i32,
    pub total_processing: i32,
    pub total_completed: i32,
    pub total_failed: i32,
}

/// Recompute the derived `status` from counters. Pure function, no I/O —
/// called after every counter mutation and, independently, by the stuck-run
/// fixer when repairing drifted counters.
pub fn derive_run_status(c: RunCounters) -> RunStatus {
    let finished = c.total_completed + c.total_failed;
    if finished < c.total_requested && c.total_processing > 0 {
        return RunStatus::Processing;
    }
    if finished < c.total_requested && c.total_processing == 0 && c.total_queued > 0 {
        return RunStatus::Queuing;
    }
    if finished >= c.total_requested {
        if c.total_completed == c.total_requested {
            return RunStatus::Completed;
        }
        if c.total_failed == c.total_requested {
            return RunStatus::Failed;
        }
        return RunStatus::Partial;
    }
    // No queued/processing/finished work yet but total_requested > 0: the
    // run was just created and no counter has moved. Treat as queuing so a
    // freshly created run has a sensible status before its first increment.
    RunStatus::Queuing
}

/// One row per generation attempt. At most one row per `(account_id,
/// content_type)` has `status` in `{queuing, processing}`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccountGenerationStatus {
    pub id: Uuid,
    pub account_id: Uuid,
    pub content_type: ContentType,
    pub total_requested: i32,
    pub total_queued: i32,
    pub total_processing: i32,
    pub total_completed: i32,
    pub total_failed: i32,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub lock_id: Option<Uuid>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AccountGenerationStatus {
    pub fn counters(&self) -> RunCounters {
        RunCounters {
            total_requested: self.total_requested,
            total_queued: self.total_queued,
            total_processing: self.total_processing,
            total_completed: self.total_completed,
            total_failed: self.total_failed,
        }
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
    fn processing_while_at_least_one_in_flight() {
        let status = derive_run_status(counters(4, 0, 2, 1, 0));
        assert_eq!(status, RunStatus::Processing);
    }

    #[test]
    fn queuing_before_any_task_starts_processing() {
        let status = derive_run_status(counters(4, 4, 0, 0, 0));
        assert_eq!(status, RunStatus::Queuing);
    }

    #[test]
    fn completed_when_all_finished_successfully() {
        let status = derive_run_status(counters(3, 0, 0, 3, 0));
        assert_eq!(status, RunStatus::Completed);
    }

    #[test]
    fn failed_when_all_finished_unsuccessfully() {
        let status = derive_run_status(counters(3, 0, 0, 0, 3));
        assert_eq!(status, RunStatus::Failed);
    }

    #[test]
    fn partial_when_finished_mixed() {
        let status = derive_run_status(counters(5, 0, 0, 3, 2));
        assert_eq!(status, RunStatus::Partial);
    }
}
