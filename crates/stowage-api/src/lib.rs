//! HTTP surface of the stowage gateway.
//!
//! Composes the metadata store, content store and transform pipeline into a
//! consistent file-serving API with HTTP cache-validation semantics,
//! presigned access, and operator-triggered reconciliation.

pub mod conditional;
pub mod error;
pub mod handlers;
pub mod presigned;
pub mod reconcile;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use routes::build_router;
pub use state::AppState;
