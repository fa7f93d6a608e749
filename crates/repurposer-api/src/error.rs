//! `IntoResponse` for [`PipelineError`].
//!
//! The orphan rule forbids implementing `axum::IntoResponse` (external
//! trait) for `PipelineError` (defined in `repurposer-core`) anywhere but a
//! crate that depends on both, so the conversion lives here rather than in
//! `repurposer-core` or `repurposer-infra`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use repurposer_core::{ErrorMetadata, LogLevel, PipelineError};
use repurposer_infra::ErrorResponse;

#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

fn log_error(err: &PipelineError) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(error_code = err.error_code(), error = %err, "request failed"),
        LogLevel::Warn => tracing::warn!(error_code = err.error_code(), error = %err, "request failed"),
        LogLevel::Error => tracing::error!(error_code = err.error_code(), error = %err, "request failed"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(&err);

        let body = ErrorResponse {
            error: err.client_message(),
            details: None,
            error_type: Some(err.error_code().to_string()),
        };
        (status, Json(body)).into_response()
    }
}
