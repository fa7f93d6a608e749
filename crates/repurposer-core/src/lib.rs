//! Repurposer Core Library
//!
//! Domain models, the core error taxonomy, configuration, and the consumed-
//! interface traits (collaborators) shared across the pipeline, worker, db,
//! and api crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod hooks;
pub mod models;

pub use config::PipelineConfig;
pub use error::{is_unique_violation, ErrorMetadata, LogLevel, PipelineError};
pub use events::{PipelineEvent, SSE_HEARTBEAT_FRAME};
pub use hooks::{
    fingerprint_similarity, Cache, FingerprintEngine, HashingFingerprintEngine, NoOpCache,
    NoOpRenderEngine, NoOpSocialMediaGateway, RenderEngine, SocialMediaGateway, VideoFingerprint,
};
