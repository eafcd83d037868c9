//! File metadata models.
//!
//! `FileMetadata` is the authoritative record of one stored file's servable
//! identity: id, name, size, mime type, checksum (serialized as a quoted
//! ETag token), timestamps and upload state. The checksum must always match
//! the bytes currently retrievable for the id; a transformed representation
//! gets a fresh, response-local copy of this struct, never a mutation of the
//! stored row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Servable identity of one stored file at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    pub size: i64,
    pub mime_type: String,
    /// Strong hash of the content, as a quoted ETag token, e.g. `"abc123"`.
    pub etag: String,
    pub bucket_id: String,
    /// True only after content bytes are durably stored. A row with
    /// `is_uploaded = false` must never be served on a public read path.
    pub is_uploaded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileMetadata {
    /// Descriptor for a derived (transformed) representation: same identity,
    /// new size and checksum. Used only for the response being built.
    pub fn with_derived_content(&self, size: i64, etag: String, mime_type: String) -> Self {
        FileMetadata {
            size,
            etag,
            mime_type,
            ..self.clone()
        }
    }
}

/// Slim listing row used by reconciliation and ops endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    pub is_uploaded: bool,
    pub bucket_id: String,
}
