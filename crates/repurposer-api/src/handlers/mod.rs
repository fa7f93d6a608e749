//! The six thin handlers exposing the pipeline's public operations.
//!
//! No business logic, no JSON-binding validation beyond what `axum`'s
//! extractors already do, no authentication. Each handler resolves its
//! dependencies via `State<AppState>`'s `FromRef` split and calls straight
//! into the matching pipeline component.

pub mod events;
pub mod generate;
pub mod status;
pub mod sync;
