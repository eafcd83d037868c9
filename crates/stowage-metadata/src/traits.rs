//! Metadata store abstraction trait

use async_trait::async_trait;
use stowage_core::models::{BucketPolicy, FileMetadata, FileSummary};
use thiserror::Error;

/// Metadata store operation errors
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("metadata backend error: {0}")]
    Backend(String),
}

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Parameters for initializing a file row before its content is uploaded.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub id: String,
    pub name: String,
    pub bucket_id: String,
    pub mime_type: String,
}

/// Metadata store abstraction.
///
/// The gateway only reads and classifies through this trait; destructive
/// actions (`delete_file_by_id`) are issued explicitly by the reconciliation
/// engine or a client delete, never implicitly.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch the full metadata row for a file id.
    async fn get_file_by_id(&self, id: &str) -> MetadataResult<FileMetadata>;

    /// Fetch a bucket's policy (cache-control, presign settings, limits).
    async fn get_bucket_by_id(&self, id: &str) -> MetadataResult<BucketPolicy>;

    /// List every file row as a slim summary. Used by reconciliation.
    async fn list_files(&self) -> MetadataResult<Vec<FileSummary>>;

    /// Delete a file row. Content bytes are not touched.
    async fn delete_file_by_id(&self, id: &str) -> MetadataResult<()>;

    /// Create a row with `is_uploaded = false` ahead of a content upload.
    async fn initialize_file(&self, file: NewFile) -> MetadataResult<FileMetadata>;

    /// Record the final size/checksum once content is durably stored and
    /// flip `is_uploaded` to true. Advances `updated_at`.
    async fn populate_metadata(
        &self,
        id: &str,
        size: i64,
        etag: &str,
        mime_type: &str,
    ) -> MetadataResult<FileMetadata>;
}
