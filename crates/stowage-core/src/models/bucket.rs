//! Bucket policy model.

use serde::{Deserialize, Serialize};

/// Container-level settings owned by the metadata store. Read-only from the
/// gateway's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketPolicy {
    pub id: String,
    pub min_upload_file: i64,
    pub max_upload_file: i64,
    pub presigned_urls_enabled: bool,
    /// Download-link expiry, in seconds.
    pub download_expiration: i64,
    /// Cache-Control directive applied to responses for files in this bucket.
    pub cache_control: String,
}

impl Default for BucketPolicy {
    fn default() -> Self {
        BucketPolicy {
            id: "default".to_string(),
            min_upload_file: 0,
            max_upload_file: 50 * 1024 * 1024,
            presigned_urls_enabled: true,
            download_expiration: 30,
            cache_control: "max-age=3600".to_string(),
        }
    }
}
