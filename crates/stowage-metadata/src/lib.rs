//! Metadata store capability.
//!
//! The metadata store is the authoritative record of file existence, size,
//! checksum and upload state. The gateway consumes it through the
//! `MetadataStore` trait; this crate ships a Postgres implementation and an
//! in-memory implementation used by tests and dev mode.

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryMetadataStore;
pub use postgres::PostgresMetadataStore;
pub use traits::{MetadataError, MetadataResult, MetadataStore, NewFile};
