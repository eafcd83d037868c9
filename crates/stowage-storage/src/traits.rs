//! Content storage abstraction trait

use crate::presign::PresignParams;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Content store operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("content not found: {0}")]
    NotFound(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One retrievable object, possibly a partial (ranged) view of it.
#[derive(Debug, Clone)]
pub struct FileObject {
    pub body: Bytes,
    pub content_length: i64,
    pub content_type: Option<String>,
    /// 200 for a full object, 206 for a ranged read.
    pub status_code: u16,
    /// `Content-Range` value for ranged reads.
    pub content_range: Option<String>,
}

impl FileObject {
    pub fn full(body: Bytes, content_type: Option<String>) -> Self {
        let content_length = body.len() as i64;
        FileObject {
            body,
            content_length,
            content_type,
            status_code: 200,
            content_range: None,
        }
    }
}

/// A single byte range from a `Range: bytes=...` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive end; `None` means "to the end of the object".
    pub end: Option<u64>,
}

impl ByteRange {
    /// Parse a `bytes=start-end` header value. Multi-range requests and
    /// suffix ranges (`bytes=-n`) are not supported.
    pub fn parse(header: &str) -> StorageResult<ByteRange> {
        let spec = header
            .strip_prefix("bytes=")
            .ok_or_else(|| StorageError::InvalidRange(header.to_string()))?;
        if spec.contains(',') {
            return Err(StorageError::InvalidRange(header.to_string()));
        }
        let (start, end) = spec
            .split_once('-')
            .ok_or_else(|| StorageError::InvalidRange(header.to_string()))?;
        let start: u64 = start
            .parse()
            .map_err(|_| StorageError::InvalidRange(header.to_string()))?;
        let end = if end.is_empty() {
            None
        } else {
            let e: u64 = end
                .parse()
                .map_err(|_| StorageError::InvalidRange(header.to_string()))?;
            if e < start {
                return Err(StorageError::InvalidRange(header.to_string()));
            }
            Some(e)
        };
        Ok(ByteRange { start, end })
    }

    /// Slice `data` to this range. Returns the slice plus the
    /// `Content-Range` header value describing it.
    pub fn apply(&self, data: &Bytes) -> StorageResult<(Bytes, String)> {
        let total = data.len() as u64;
        if self.start >= total {
            return Err(StorageError::InvalidRange(format!(
                "range start {} beyond object size {}",
                self.start, total
            )));
        }
        let end = self.end.map_or(total - 1, |e| e.min(total - 1));
        let sliced = data.slice(self.start as usize..=end as usize);
        let content_range = format!("bytes {}-{}/{}", self.start, end, total);
        Ok((sliced, content_range))
    }
}

/// Content storage abstraction.
///
/// All reads are side-effect free; `delete` is only ever invoked explicitly
/// (client delete or reconciliation).
#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Store bytes under an id, returning the quoted sha256 ETag of what was
    /// written.
    async fn put(&self, id: &str, content_type: &str, data: Bytes) -> StorageResult<String>;

    /// Fetch an object, optionally a byte range of it.
    async fn get(&self, id: &str, range: Option<&str>) -> StorageResult<FileObject>;

    /// Complete id listing. Used by reconciliation; O(N) by design.
    async fn list_ids(&self) -> StorageResult<Vec<String>>;

    /// Delete an object's bytes. Metadata rows are not touched.
    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Build a time-limited signed URL for the object.
    async fn create_presigned_url(&self, id: &str, expires_in: Duration)
        -> StorageResult<String>;

    /// Fetch an object through its presigned parameters, verifying the
    /// signature before touching any bytes.
    async fn get_presigned(
        &self,
        id: &str,
        params: &PresignParams,
        range: Option<&str>,
    ) -> StorageResult<FileObject>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_closed_range() {
        let r = ByteRange::parse("bytes=0-9").unwrap();
        assert_eq!(r, ByteRange { start: 0, end: Some(9) });
    }

    #[test]
    fn test_parse_open_range() {
        let r = ByteRange::parse("bytes=5-").unwrap();
        assert_eq!(r, ByteRange { start: 5, end: None });
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ByteRange::parse("0-9").is_err());
        assert!(ByteRange::parse("bytes=a-b").is_err());
        assert!(ByteRange::parse("bytes=9-5").is_err());
        assert!(ByteRange::parse("bytes=0-4,6-9").is_err());
    }

    #[test]
    fn test_apply_clamps_end() {
        let data = Bytes::from_static(b"hello world");
        let r = ByteRange { start: 6, end: Some(100) };
        let (slice, content_range) = r.apply(&data).unwrap();
        assert_eq!(&slice[..], b"world");
        assert_eq!(content_range, "bytes 6-10/11");
    }

    #[test]
    fn test_apply_rejects_start_past_end() {
        let data = Bytes::from_static(b"abc");
        let r = ByteRange { start: 3, end: None };
        assert!(r.apply(&data).is_err());
    }
}
