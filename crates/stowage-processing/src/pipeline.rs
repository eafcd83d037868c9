//! Bounded-concurrency transformation pipeline.
//!
//! Transformation is memory- and CPU-intensive, so a fixed-size semaphore
//! caps how many run at once; additional requests wait for a permit instead
//! of queueing unboundedly. Option validation happens before a permit is
//! acquired, the CPU work runs on the blocking pool, and the permit travels
//! with it so any failure or panic releases the slot.

use crate::codec::{Codec, ImageCodec};
use crate::options::TransformOptions;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Debug, Error)]
pub enum TransformError {
    /// Client asked for a transform on a non-image source. Safe to expose.
    #[error("image transformation features are not supported for '{0}'")]
    UnsupportedMimeType(String),

    /// Stored bytes failed to decode or re-encode. The bytes were validated
    /// at upload time, so this indicates storage or codec drift, not client
    /// error.
    #[error("image processing failed: {0}")]
    Processing(String),

    /// The blocking task was torn down before completing.
    #[error("transform task failed: {0}")]
    Task(String),
}

/// Output of one transformation: the derived bytes plus the recomputed
/// descriptor fields for the representation about to be served.
#[derive(Debug, Clone)]
pub struct TransformedContent {
    pub bytes: Bytes,
    pub size: i64,
    /// Quoted sha256 of the output bytes.
    pub etag: String,
    pub content_type: String,
}

fn content_etag(data: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(data)))
}

pub struct TransformPipeline {
    codec: Arc<dyn Codec>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl TransformPipeline {
    pub fn new(codec: ImageCodec, max_concurrent: usize) -> Self {
        Self::with_codec(Arc::new(codec), max_concurrent)
    }

    /// Build around any codec implementation. Tests use this to substitute
    /// instrumented codecs.
    pub fn with_codec(codec: Arc<dyn Codec>, max_concurrent: usize) -> Self {
        TransformPipeline {
            codec,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Currently free worker slots. Exposed for instrumentation and tests.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Derive a variant of `data` per `options` and recompute its descriptor.
    ///
    /// Empty options are the pass-through case: the input is returned with a
    /// freshly computed descriptor and no worker slot is consumed.
    pub async fn transform(
        &self,
        data: Bytes,
        source_mime: &str,
        options: TransformOptions,
    ) -> Result<TransformedContent, TransformError> {
        if options.is_empty() {
            let etag = content_etag(&data);
            let size = data.len() as i64;
            return Ok(TransformedContent {
                bytes: data,
                size,
                etag,
                content_type: source_mime.to_string(),
            });
        }

        // Reject before taking a permit so bad requests never occupy a slot.
        if !TransformOptions::supports_mime_type(source_mime) {
            return Err(TransformError::UnsupportedMimeType(source_mime.to_string()));
        }

        // acquire_owned is cancellation-safe: a caller dropped while waiting
        // here never held a permit, and one dropped later releases it when
        // the blocking task finishes.
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| TransformError::Task(e.to_string()))?;

        let codec = Arc::clone(&self.codec);
        let mime = source_mime.to_string();
        let (bytes, content_type) = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            codec.transform(&data, &mime, &options)
        })
        .await
        .map_err(|e| TransformError::Task(e.to_string()))?
        .map_err(|e| TransformError::Processing(format!("{:#}", e)))?;

        let etag = content_etag(&bytes);
        let size = bytes.len() as i64;

        tracing::debug!(
            size_bytes = size,
            content_type = %content_type,
            "Image transformation complete"
        );

        Ok(TransformedContent {
            bytes: Bytes::from(bytes),
            size,
            etag,
            content_type: content_type.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png_fixture() -> Bytes {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(32, 32, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 99])
        }));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(buffer)
    }

    fn resize_options() -> TransformOptions {
        TransformOptions {
            width: Some(8),
            height: Some(8),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_transform_recomputes_descriptor() {
        let pipeline = TransformPipeline::new(ImageCodec::new(), 2);
        let source = png_fixture();
        let source_etag = content_etag(&source);

        let out = pipeline
            .transform(source.clone(), "image/png", resize_options())
            .await
            .unwrap();

        assert_ne!(out.etag, source_etag);
        assert_eq!(out.size, out.bytes.len() as i64);
        assert_eq!(out.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_transform_etag_is_stable() {
        let pipeline = TransformPipeline::new(ImageCodec::new(), 2);
        let source = png_fixture();

        let a = pipeline
            .transform(source.clone(), "image/png", resize_options())
            .await
            .unwrap();
        let b = pipeline
            .transform(source, "image/png", resize_options())
            .await
            .unwrap();

        assert_eq!(a.etag, b.etag);
        assert_eq!(a.bytes, b.bytes);
    }

    #[tokio::test]
    async fn test_unsupported_mime_rejected_without_permit_use() {
        let pipeline = TransformPipeline::new(ImageCodec::new(), 2);
        assert_eq!(pipeline.available_permits(), 2);

        let err = pipeline
            .transform(Bytes::from_static(b"text"), "text/plain", resize_options())
            .await
            .unwrap_err();

        assert!(matches!(err, TransformError::UnsupportedMimeType(_)));
        assert!(err.to_string().contains("text/plain"));
        assert_eq!(pipeline.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_empty_options_pass_through() {
        let pipeline = TransformPipeline::new(ImageCodec::new(), 2);
        let source = png_fixture();

        let out = pipeline
            .transform(source.clone(), "image/png", TransformOptions::default())
            .await
            .unwrap();

        assert_eq!(out.bytes, source);
        assert_eq!(out.etag, content_etag(&source));
        assert_eq!(pipeline.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_source_is_processing_error_and_releases_permit() {
        let pipeline = TransformPipeline::new(ImageCodec::new(), 1);
        let err = pipeline
            .transform(
                Bytes::from_static(b"not an image"),
                "image/png",
                resize_options(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::Processing(_)));
        assert_eq!(pipeline.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_burst_of_twice_the_cap_completes() {
        let cap = 2;
        let pipeline = Arc::new(TransformPipeline::new(ImageCodec::new(), cap));
        let source = png_fixture();

        let tasks: Vec<_> = (0..cap * 2)
            .map(|_| {
                let pipeline = Arc::clone(&pipeline);
                let source = source.clone();
                tokio::spawn(async move {
                    pipeline
                        .transform(source, "image/png", resize_options())
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(pipeline.available_permits(), cap);
    }

    /// Codec that records how many transforms overlap, holding each one open
    /// long enough for concurrent callers to pile up.
    #[derive(Default)]
    struct CountingCodec {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl Codec for CountingCodec {
        fn transform(
            &self,
            data: &[u8],
            _source_mime: &str,
            _options: &TransformOptions,
        ) -> anyhow::Result<(Vec<u8>, &'static str)> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(25));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok((data.to_vec(), "image/png"))
        }
    }

    #[tokio::test]
    async fn test_concurrent_transforms_never_exceed_cap() {
        let cap = 2;
        let codec = Arc::new(CountingCodec::default());
        let pipeline = Arc::new(TransformPipeline::with_codec(codec.clone(), cap));

        let tasks: Vec<_> = (0..cap * 2)
            .map(|_| {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    pipeline
                        .transform(Bytes::from_static(b"payload"), "image/png", resize_options())
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let observed_max = codec.max_in_flight.load(Ordering::SeqCst);
        assert!(observed_max >= 1);
        assert!(
            observed_max <= cap,
            "{} transforms ran concurrently with cap {}",
            observed_max,
            cap
        );
        assert_eq!(pipeline.available_permits(), cap);
    }
}
