//! Content store capability.
//!
//! The content store holds the actual bytes, addressed by opaque id. The
//! gateway consumes it through the `ContentStorage` trait; this crate ships a
//! local filesystem backend with HMAC-signed presigned URLs and an in-memory
//! backend used by tests.

pub mod local;
pub mod memory;
pub mod presign;
pub mod traits;

pub use local::LocalContentStorage;
pub use memory::MemoryContentStorage;
pub use presign::{PresignParams, PresignSigner, AMZ_DATE_FORMAT};
pub use traits::{ByteRange, ContentStorage, FileObject, StorageError, StorageResult};
