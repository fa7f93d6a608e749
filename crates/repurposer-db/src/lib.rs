//! Repurposer Database Library
//!
//! Postgres-backed repositories for every entity in the generation and post-
//! sync pipeline's data model.

pub mod db;

pub use db::{
    AccountRepository, ClientRepository, ContentAccountRepository, ContentRepository,
    GeneratedContentRepository, LockRepository, PostRepository, RunRepository,
    SyncStatusRepository, TextOverlayRepository,
};
