pub mod files;
pub mod health;
pub mod ops;
pub mod presigned;

pub use files::{fetch_file_metadata, FileResponse, TransformQuery};
