//! In-memory metadata store.
//!
//! Used by tests and by dev mode (`STOWAGE_METADATA_BACKEND=memory`). State
//! lives in `RwLock`-guarded maps; a default bucket is seeded at construction
//! so a fresh instance can serve files immediately.

use crate::traits::{MetadataError, MetadataResult, MetadataStore, NewFile};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use stowage_core::models::{BucketPolicy, FileMetadata, FileSummary};
use tokio::sync::RwLock;

pub struct MemoryMetadataStore {
    files: RwLock<HashMap<String, FileMetadata>>,
    buckets: RwLock<HashMap<String, BucketPolicy>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        let mut buckets = HashMap::new();
        let default = BucketPolicy::default();
        buckets.insert(default.id.clone(), default);
        MemoryMetadataStore {
            files: RwLock::new(HashMap::new()),
            buckets: RwLock::new(buckets),
        }
    }

    /// Seed a fully-formed row. Test helper; bypasses the initialize/populate
    /// lifecycle.
    pub async fn insert_file(&self, file: FileMetadata) {
        self.files.write().await.insert(file.id.clone(), file);
    }

    pub async fn insert_bucket(&self, bucket: BucketPolicy) {
        self.buckets.write().await.insert(bucket.id.clone(), bucket);
    }
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get_file_by_id(&self, id: &str) -> MetadataResult<FileMetadata> {
        self.files
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| MetadataError::FileNotFound(id.to_string()))
    }

    async fn get_bucket_by_id(&self, id: &str) -> MetadataResult<BucketPolicy> {
        self.buckets
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| MetadataError::BucketNotFound(id.to_string()))
    }

    async fn list_files(&self) -> MetadataResult<Vec<FileSummary>> {
        let files = self.files.read().await;
        let mut summaries: Vec<FileSummary> = files
            .values()
            .map(|f| FileSummary {
                id: f.id.clone(),
                name: f.name.clone(),
                is_uploaded: f.is_uploaded,
                bucket_id: f.bucket_id.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    async fn delete_file_by_id(&self, id: &str) -> MetadataResult<()> {
        self.files
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MetadataError::FileNotFound(id.to_string()))
    }

    async fn initialize_file(&self, file: NewFile) -> MetadataResult<FileMetadata> {
        let mut files = self.files.write().await;
        if files.contains_key(&file.id) {
            return Err(MetadataError::AlreadyExists(file.id));
        }
        if !self.buckets.read().await.contains_key(&file.bucket_id) {
            return Err(MetadataError::BucketNotFound(file.bucket_id));
        }
        let now = Utc::now();
        let row = FileMetadata {
            id: file.id.clone(),
            name: file.name,
            size: 0,
            mime_type: file.mime_type,
            etag: String::new(),
            bucket_id: file.bucket_id,
            is_uploaded: false,
            created_at: now,
            updated_at: now,
        };
        files.insert(file.id, row.clone());
        Ok(row)
    }

    async fn populate_metadata(
        &self,
        id: &str,
        size: i64,
        etag: &str,
        mime_type: &str,
    ) -> MetadataResult<FileMetadata> {
        let mut files = self.files.write().await;
        let row = files
            .get_mut(id)
            .ok_or_else(|| MetadataError::FileNotFound(id.to_string()))?;
        row.size = size;
        row.etag = etag.to_string();
        row.mime_type = mime_type.to_string();
        row.is_uploaded = true;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}
