//! Core domain types for the stowage gateway.
//!
//! This crate holds the models shared by every other crate (file metadata,
//! bucket policies), the unified `AppError` taxonomy, and environment-driven
//! configuration. It has no I/O of its own.

pub mod config;
pub mod error;
pub mod models;

pub use config::{Config, MetadataBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
