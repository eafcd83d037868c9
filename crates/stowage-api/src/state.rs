//! Application state shared by all handlers.

use std::sync::Arc;
use stowage_core::Config;
use stowage_metadata::MetadataStore;
use stowage_processing::TransformPipeline;
use stowage_storage::ContentStorage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub metadata: Arc<dyn MetadataStore>,
    pub storage: Arc<dyn ContentStorage>,
    pub pipeline: Arc<TransformPipeline>,
}

impl AppState {
    pub fn new(
        config: Config,
        metadata: Arc<dyn MetadataStore>,
        storage: Arc<dyn ContentStorage>,
        pipeline: TransformPipeline,
    ) -> Self {
        AppState {
            config: Arc::new(config),
            metadata,
            storage,
            pipeline: Arc::new(pipeline),
        }
    }
}
