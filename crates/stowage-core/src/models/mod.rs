pub mod bucket;
pub mod file;

pub use bucket::BucketPolicy;
pub use file::{FileMetadata, FileSummary};
