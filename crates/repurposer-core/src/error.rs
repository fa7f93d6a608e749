//! Error types for the generation and post-sync pipeline.
//!
//! `PipelineError` unifies the error taxonomy with the ambient errors the
//! repository layer raises. `ErrorMetadata` lets a thin HTTP layer render any
//! `PipelineError` without re-deriving policy about status codes or retry-
//! ability.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

/// Defines how an error should be presented to a caller.
pub trait ErrorMetadata {
    /// HTTP status code an exposing layer should return.
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code, stable across releases.
    fn error_code(&self) -> &'static str;

    /// Whether the operation that raised this error can be retried as-is.
    fn is_recoverable(&self) -> bool;

    /// Caller-facing message (never includes internal detail).
    fn client_message(&self) -> String;

    /// Log level this error should be reported at.
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Another run or sync is already active on this (account, content_type)
    /// or (account) key. Never retried automatically.
    #[error("busy: {0}")]
    Busy(String),

    /// The per-type posting goal would be exceeded by this request.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Account platform is not in {Instagram, TikTok}.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Requested content type has no selection/execution strategy.
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    /// The selection planner reserved zero items.
    #[error("no content available for account {account_id}, type {content_type}")]
    NoContentAvailable {
        account_id: uuid::Uuid,
        content_type: String,
    },

    /// Selected content has no content files to work with.
    #[error("content {content_id} has no content files")]
    NoContentFiles { content_id: uuid::Uuid },

    /// The task queue rejected a submission.
    #[error("task submit failed: {0}")]
    TaskSubmitFailure(String),

    /// The render worker reported a failure result.
    #[error("render failed: {0}")]
    RenderFailure(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A precondition failed before any state was written (e.g. quantity =
    /// 0).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Persistence failure. Never retried blindly — callers must not leak
    /// locks by assuming the write did or did not land.
    #[cfg(feature = "sqlx")]
    #[error("database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("database error: {0}")]
    Database(String),

    /// Catch-all for anything not covered above.
    #[error("unknown error: {0}")]
    Unknown(#[source] anyhow::Error),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for PipelineError {
    fn from(err: SqlxError) -> Self {
        PipelineError::Database(err)
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Unknown(err)
    }
}

impl PipelineError {
    /// The stable machine-readable code stored on a run's `error_code`
    /// column: `unsupported_type`, `no_content_available`, `unknown`, etc.
    pub fn run_error_code(&self) -> &'static str {
        match self {
            PipelineError::Busy(_) => "busy",
            PipelineError::LimitExceeded(_) => "limit_exceeded",
            PipelineError::UnsupportedPlatform(_) => "unsupported_platform",
            PipelineError::UnsupportedType(_) => "unsupported_type",
            PipelineError::NoContentAvailable { .. } => "no_content_available",
            PipelineError::NoContentFiles { .. } => "no_content_files",
            PipelineError::TaskSubmitFailure(_) => "task_submit_failure",
            PipelineError::RenderFailure(_) => "render_failure",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::Database(_) => "database_error",
            PipelineError::Unknown(_) => "unknown",
        }
    }
}

impl ErrorMetadata for PipelineError {
    fn http_status_code(&self) -> u16 {
        match self {
            PipelineError::Busy(_) => 409,
            PipelineError::LimitExceeded(_) => 422,
            PipelineError::UnsupportedPlatform(_) => 422,
            PipelineError::UnsupportedType(_) => 422,
            PipelineError::NoContentAvailable { .. } => 409,
            PipelineError::NoContentFiles { .. } => 422,
            PipelineError::TaskSubmitFailure(_) => 502,
            PipelineError::RenderFailure(_) => 502,
            PipelineError::NotFound(_) => 404,
            PipelineError::InvalidInput(_) => 400,
            PipelineError::Database(_) => 500,
            PipelineError::Unknown(_) => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Busy(_) => "BUSY",
            PipelineError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            PipelineError::UnsupportedPlatform(_) => "UNSUPPORTED_PLATFORM",
            PipelineError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            PipelineError::NoContentAvailable { .. } => "NO_CONTENT_AVAILABLE",
            PipelineError::NoContentFiles { .. } => "NO_CONTENT_FILES",
            PipelineError::TaskSubmitFailure(_) => "TASK_SUBMIT_FAILURE",
            PipelineError::RenderFailure(_) => "RENDER_FAILURE",
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::InvalidInput(_) => "INVALID_INPUT",
            PipelineError::Database(_) => "DATABASE_ERROR",
            PipelineError::Unknown(_) => "UNKNOWN",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            PipelineError::Busy(_) => false,
            PipelineError::LimitExceeded(_) => false,
            PipelineError::UnsupportedPlatform(_) => false,
            PipelineError::UnsupportedType(_) => false,
            PipelineError::NoContentAvailable { .. } => false,
            PipelineError::NoContentFiles { .. } => false,
            PipelineError::TaskSubmitFailure(_) => true,
            PipelineError::RenderFailure(_) => true,
            PipelineError::NotFound(_) => false,
            PipelineError::InvalidInput(_) => false,
            PipelineError::Database(_) => true,
            PipelineError::Unknown(_) => false,
        }
    }

    fn client_message(&self) -> String {
        match self {
            PipelineError::Busy(msg) => msg.clone(),
            PipelineError::LimitExceeded(msg) => msg.clone(),
            PipelineError::UnsupportedPlatform(msg) => msg.clone(),
            PipelineError::UnsupportedType(msg) => msg.clone(),
            PipelineError::NoContentAvailable {
                account_id,
                content_type,
            } => format!("no content available for account {account_id}, type {content_type}"),
            PipelineError::NoContentFiles { content_id } => {
                format!("content {content_id} has no files")
            }
            PipelineError::TaskSubmitFailure(_) => "failed to submit render task".to_string(),
            PipelineError::RenderFailure(_) => "render failed".to_string(),
            PipelineError::NotFound(msg) => msg.clone(),
            PipelineError::InvalidInput(msg) => msg.clone(),
            PipelineError::Database(_) => "internal error".to_string(),
            PipelineError::Unknown(_) => "internal error".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::Busy(_) => LogLevel::Debug,
            PipelineError::LimitExceeded(_) => LogLevel::Debug,
            PipelineError::UnsupportedPlatform(_) => LogLevel::Debug,
            PipelineError::UnsupportedType(_) => LogLevel::Debug,
            PipelineError::NoContentAvailable { .. } => LogLevel::Warn,
            PipelineError::NoContentFiles { .. } => LogLevel::Warn,
            PipelineError::TaskSubmitFailure(_) => LogLevel::Error,
            PipelineError::RenderFailure(_) => LogLevel::Error,
            PipelineError::NotFound(_) => LogLevel::Debug,
            PipelineError::InvalidInput(_) => LogLevel::Debug,
            PipelineError::Database(_) => LogLevel::Error,
            PipelineError::Unknown(_) => LogLevel::Error,
        }
    }
}

/// Postgres unique-violation SQLSTATE, used at the repository boundary to
/// translate a uniqueness conflict on `GenerationLock`/`AccountSyncStatus`
/// into `PipelineError::Busy`.
#[cfg(feature = "sqlx")]
pub fn is_unique_violation(err: &SqlxError) -> bool {
    matches!(err, SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_is_not_recoverable_and_maps_to_409() {
        let err = PipelineError::Busy("account 1, video".to_string());
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "BUSY");
        assert!(!err.is_recoverable());
        assert_eq!(err.run_error_code(), "busy");
    }

    #[test]
    fn no_content_available_maps_to_run_error_code() {
        let err = PipelineError::NoContentAvailable {
            account_id: uuid::Uuid::nil(),
            content_type: "video".to_string(),
        };
        assert_eq!(err.run_error_code(), "no_content_available");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn task_submit_failure_is_recoverable() {
        let err = PipelineError::TaskSubmitFailure("queue unavailable".to_string());
        assert!(err.is_recoverable());
        assert_eq!(err.http_status_code(), 502);
    }

    #[test]
    fn unknown_wraps_anyhow_and_is_not_recoverable() {
        let err: PipelineError = anyhow::anyhow!("boom").into();
        assert_eq!(err.run_error_code(), "unknown");
        assert!(!err.is_recoverable());
    }
}
