//! Standard JSON error response shape for the HTTP layer.
//!
//! `repurposer-api` converts a `PipelineError` into one of these via
//! `ErrorMetadata`; kept here (not in `repurposer-core`) so the wire format
//! can evolve independently of the error taxonomy it's built from.
//!
//! Note: `IntoResponse` for `PipelineError` lives in the binary crate
//! (`repurposer-api`) due to the orphan rule: an external trait
//! (`axum::IntoResponse`) for an external type
//! (`repurposer_core::PipelineError`) cannot be implemented here.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}
