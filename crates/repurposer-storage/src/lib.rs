//! Object Store consumed-interface contract for the generation and post-sync
//! pipeline.

pub mod local;
pub mod traits;

pub use local::LocalObjectStore;
pub use traits::{ObjectStore, StorageError, StorageResult};
