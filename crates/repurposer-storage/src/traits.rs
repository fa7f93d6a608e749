//! Object Store consumed-interface trait.
//!
//! Blob ids are integers owned by a `File` table entity with ETag uniqueness
//! per Client. The pipeline crate never talks to a concrete backend directly
//! — only to this trait — so it can be exercised against
//! [`crate::local::InMemoryObjectStore`] in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Object store operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("blob not found: {0}")]
    NotFound(i64),

    #[error("backend error: {0}")]
    BackendError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// `Upload`, `Delete`, `BulkDelete`, `DownloadStream`. `content_type` is the
/// MIME type of the uploaded blob; the returned `i64` is the blob id
/// subsequent reads and the `File` row key on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, content_type: &str, data: Vec<u8>) -> StorageResult<i64>;

    async fn delete(&self, blob_id: i64) -> StorageResult<()>;

    /// Fire-and-forget bulk delete.
    async fn bulk_delete(&self, blob_ids: &[i64]) -> StorageResult<()>;

    async fn download_stream(
        &self,
        blob_id: i64,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>>;
}
