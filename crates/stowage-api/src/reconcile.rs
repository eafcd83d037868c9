//! Reconciliation engine.
//!
//! Detects and optionally corrects divergence between the metadata store and
//! the content store: orphaned content (bytes with no accounting metadata
//! row) and broken metadata (uploaded rows with no bytes). Classification is
//! a full O(N) listing comparison intended for operator-triggered batch
//! runs, never the per-request path. Corrective deletes run sequentially and
//! abort on the first failure; there is no cross-store transaction primitive,
//! so already-applied deletes stay applied.

use std::collections::HashSet;
use std::sync::Arc;
use stowage_core::models::FileSummary;
use stowage_core::AppError;
use stowage_metadata::MetadataStore;
use stowage_storage::ContentStorage;

use crate::error::{metadata_error, storage_error};

/// Orphan-inclusion policy: a metadata row accounts for its content entry
/// whether or not the row is marked uploaded. Content matching a pending
/// (not-yet-uploaded) row is therefore never classified as orphaned.
pub const PENDING_UPLOAD_ACCOUNTS_FOR_CONTENT: bool = true;

#[derive(Clone)]
pub struct ReconciliationEngine {
    metadata: Arc<dyn MetadataStore>,
    storage: Arc<dyn ContentStorage>,
}

impl ReconciliationEngine {
    pub fn new(metadata: Arc<dyn MetadataStore>, storage: Arc<dyn ContentStorage>) -> Self {
        ReconciliationEngine { metadata, storage }
    }

    /// Content-store ids with no accounting metadata row.
    pub async fn list_orphans(&self) -> Result<Vec<String>, AppError> {
        let files = self.metadata.list_files().await.map_err(metadata_error)?;
        let content_ids = self.storage.list_ids().await.map_err(storage_error)?;

        let accounted: HashSet<&str> = files
            .iter()
            .filter(|f| f.is_uploaded || PENDING_UPLOAD_ACCOUNTS_FOR_CONTENT)
            .map(|f| f.id.as_str())
            .collect();

        Ok(content_ids
            .into_iter()
            .filter(|id| !accounted.contains(id.as_str()))
            .collect())
    }

    /// Metadata rows marked uploaded whose bytes are missing.
    pub async fn list_broken_metadata(&self) -> Result<Vec<FileSummary>, AppError> {
        let files = self.metadata.list_files().await.map_err(metadata_error)?;
        let content_ids: HashSet<String> = self
            .storage
            .list_ids()
            .await
            .map_err(storage_error)?
            .into_iter()
            .collect();

        Ok(files
            .into_iter()
            .filter(|f| f.is_uploaded && !content_ids.contains(&f.id))
            .collect())
    }

    /// Metadata rows still waiting for their upload to complete.
    pub async fn list_not_uploaded(&self) -> Result<Vec<FileSummary>, AppError> {
        let files = self.metadata.list_files().await.map_err(metadata_error)?;
        Ok(files.into_iter().filter(|f| !f.is_uploaded).collect())
    }

    /// Classify orphans, then delete their content. Aborts on the first
    /// failed delete, surfacing that entry's error.
    pub async fn delete_orphans(&self) -> Result<Vec<String>, AppError> {
        let to_delete = self.list_orphans().await?;
        for id in &to_delete {
            self.storage.delete(id).await.map_err(|e| {
                tracing::error!(file_id = %id, error = %e, "Orphan delete aborted");
                storage_error(e)
            })?;
        }
        tracing::info!(count = to_delete.len(), "Deleted orphaned content");
        Ok(to_delete)
    }

    /// Classify broken metadata, then delete the rows. Aborts on the first
    /// failed delete.
    pub async fn delete_broken_metadata(&self) -> Result<Vec<FileSummary>, AppError> {
        let missing = self.list_broken_metadata().await?;
        for entry in &missing {
            self.metadata
                .delete_file_by_id(&entry.id)
                .await
                .map_err(|e| {
                    tracing::error!(file_id = %entry.id, error = %e, "Broken-metadata delete aborted");
                    metadata_error(e)
                })?;
        }
        tracing::info!(count = missing.len(), "Deleted broken metadata rows");
        Ok(missing)
    }
}
