//! Local filesystem content store.
//!
//! Objects are stored as flat files named by their opaque id under a root
//! directory. Content types are not persisted here; the metadata store is
//! authoritative for them. Presigned URLs are signed with the shared
//! `PresignSigner` and verified before any bytes are touched.

use crate::presign::{PresignParams, PresignSigner};
use crate::traits::{ByteRange, ContentStorage, FileObject, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub struct LocalContentStorage {
    root: PathBuf,
    /// Base URL for presigned links, e.g. `http://localhost:8000`.
    public_url: String,
    signer: PresignSigner,
}

impl LocalContentStorage {
    pub async fn new(
        root: impl Into<PathBuf>,
        public_url: String,
        signer: PresignSigner,
    ) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::Backend(format!(
                "failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(LocalContentStorage {
            root,
            public_url,
            signer,
        })
    }

    /// Ids are opaque tokens, never paths. Anything that could traverse out
    /// of the root is rejected outright.
    fn id_to_path(&self, id: &str) -> StorageResult<PathBuf> {
        if id.is_empty()
            || id.contains("..")
            || id.contains('/')
            || id.contains('\\')
            || id.starts_with('.')
        {
            return Err(StorageError::InvalidKey(id.to_string()));
        }
        Ok(self.root.join(id))
    }

    async fn read_object(&self, id: &str, range: Option<&str>) -> StorageResult<FileObject> {
        let path = self.id_to_path(id)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(id.to_string()));
        }

        let data = Bytes::from(fs::read(&path).await.map_err(|e| {
            StorageError::Backend(format!("failed to read {}: {}", path.display(), e))
        })?);

        tracing::debug!(
            id = %id,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local content read"
        );

        match range {
            None => Ok(FileObject::full(data, None)),
            Some(header) => {
                let (body, content_range) = ByteRange::parse(header)?.apply(&data)?;
                let content_length = body.len() as i64;
                Ok(FileObject {
                    body,
                    content_length,
                    content_type: None,
                    status_code: 206,
                    content_range: Some(content_range),
                })
            }
        }
    }
}

#[async_trait]
impl ContentStorage for LocalContentStorage {
    async fn put(&self, id: &str, _content_type: &str, data: Bytes) -> StorageResult<String> {
        let path = self.id_to_path(id)?;
        let size = data.len();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::Backend(format!("failed to create {}: {}", path.display(), e))
        })?;
        file.write_all(&data).await.map_err(|e| {
            StorageError::Backend(format!("failed to write {}: {}", path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::Backend(format!("failed to sync {}: {}", path.display(), e))
        })?;

        let etag = format!("\"{}\"", hex::encode(Sha256::digest(&data)));

        tracing::info!(id = %id, size_bytes = size, "Local content write");

        Ok(etag)
    }

    async fn get(&self, id: &str, range: Option<&str>) -> StorageResult<FileObject> {
        self.read_object(id, range).await
    }

    async fn list_ids(&self) -> StorageResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            StorageError::Backend(format!("failed to list {}: {}", self.root.display(), e))
        })?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
        {
            if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                if let Some(name) = entry.file_name().to_str() {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let path = self.id_to_path(id)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(id.to_string()));
        }
        fs::remove_file(&path).await.map_err(|e| {
            StorageError::Backend(format!("failed to delete {}: {}", path.display(), e))
        })?;
        tracing::info!(id = %id, "Local content delete");
        Ok(())
    }

    async fn create_presigned_url(
        &self,
        id: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        // Fail fast if the object is missing so callers never hand out a
        // signed link to nothing.
        let path = self.id_to_path(id)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let params = self
            .signer
            .sign(id, expires_in.as_secs() as i64, Utc::now());
        Ok(format!(
            "{}/v1/files/{}/presignedurl/content?{}",
            self.public_url.trim_end_matches('/'),
            id,
            params.to_query()
        ))
    }

    async fn get_presigned(
        &self,
        id: &str,
        params: &PresignParams,
        range: Option<&str>,
    ) -> StorageResult<FileObject> {
        self.signer.verify(id, params)?;
        self.read_object(id, range).await
    }
}
