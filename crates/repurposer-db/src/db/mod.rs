//! Database repositories for the generation and post-sync pipeline.
//!
//! One repository entity that the pipeline mutates. Every single- flight
//! primitive (lock acquire, sync acquire) translates a Postgres uniqueness
//! violation into `PipelineError::Busy` at this boundary rather than bubbling
//! a raw `sqlx::Error`.

pub mod account_repository;
pub mod client_repository;
pub mod content_account_repository;
pub mod content_repository;
pub mod generated_content_repository;
pub mod lock_repository;
pub mod post_repository;
pub mod run_repository;
pub mod sync_status_repository;
pub mod text_overlay_repository;

pub use account_repository::AccountRepository;
pub use client_repository::ClientRepository;
pub use content_account_repository::ContentAccountRepository;
pub use content_repository::ContentRepository;
pub use generated_content_repository::GeneratedContentRepository;
pub use lock_repository::LockRepository;
pub use post_repository::PostRepository;
pub use run_repository::RunRepository;
pub use sync_status_repository::SyncStatusRepository;
pub use text_overlay_repository::TextOverlayRepository;
