//! Shared infrastructure for the repurposer workspace.
//!
//! Pure cross-cutting concerns only: HTTP middleware, tracing setup, and the
//! event-bus transport behind the run event stream. Business logic lives in
//! `repurposer-pipeline`.

pub mod error;
pub mod event_bus;
pub mod middleware;
pub mod recovery_scheduler;
pub mod telemetry;

pub use error::ErrorResponse;
pub use event_bus::EventBus;
pub use middleware::{
    get_request_id, request_id_middleware, security_headers_middleware, RequestId,
};
pub use recovery_scheduler::RecoveryJobRunner;
pub use telemetry::init_telemetry;
