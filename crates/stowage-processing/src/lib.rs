//! Image transformation pipeline.
//!
//! Derives variant images (resized/blurred/recompressed) from stored bytes
//! under a hard concurrency cap, and recomputes the content descriptor
//! (size, checksum) of the output so conditional-request evaluation can run
//! against the representation actually being returned.

pub mod codec;
pub mod options;
pub mod pipeline;

pub use codec::{Codec, ImageCodec};
pub use options::{OutputFormat, TransformOptions, SUPPORTED_IMAGE_TYPES};
pub use pipeline::{TransformError, TransformPipeline, TransformedContent};
