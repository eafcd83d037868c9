//! In-memory content store for tests and dev mode.
//!
//! Mirrors the local backend's behaviour, plus failure injection for
//! reconciliation tests (`fail_next_delete_of`).

use crate::presign::{PresignParams, PresignSigner};
use crate::traits::{ByteRange, ContentStorage, FileObject, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

pub struct MemoryContentStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
    failing_deletes: RwLock<HashSet<String>>,
    public_url: String,
    signer: PresignSigner,
}

impl MemoryContentStorage {
    pub fn new(public_url: String, signer: PresignSigner) -> Self {
        MemoryContentStorage {
            objects: RwLock::new(HashMap::new()),
            failing_deletes: RwLock::new(HashSet::new()),
            public_url,
            signer,
        }
    }

    /// Make `delete(id)` fail with a backend error. Test helper for
    /// first-error-abort batch semantics.
    pub async fn fail_next_delete_of(&self, id: &str) {
        self.failing_deletes.write().await.insert(id.to_string());
    }
}

#[async_trait]
impl ContentStorage for MemoryContentStorage {
    async fn put(&self, id: &str, content_type: &str, data: Bytes) -> StorageResult<String> {
        let etag = format!("\"{}\"", hex::encode(Sha256::digest(&data)));
        self.objects.write().await.insert(
            id.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(etag)
    }

    async fn get(&self, id: &str, range: Option<&str>) -> StorageResult<FileObject> {
        let objects = self.objects.read().await;
        let stored = objects
            .get(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        match range {
            None => Ok(FileObject::full(
                stored.data.clone(),
                Some(stored.content_type.clone()),
            )),
            Some(header) => {
                let (body, content_range) = ByteRange::parse(header)?.apply(&stored.data)?;
                let content_length = body.len() as i64;
                Ok(FileObject {
                    body,
                    content_length,
                    content_type: Some(stored.content_type.clone()),
                    status_code: 206,
                    content_range: Some(content_range),
                })
            }
        }
    }

    async fn list_ids(&self) -> StorageResult<Vec<String>> {
        let mut ids: Vec<String> = self.objects.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        if self.failing_deletes.read().await.contains(id) {
            return Err(StorageError::Backend(format!(
                "injected delete failure for {}",
                id
            )));
        }
        self.objects
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn create_presigned_url(
        &self,
        id: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        if !self.objects.read().await.contains_key(id) {
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
        self.get(id, range).await
    }
}
