use std::sync::Arc;

use stowage_api::{build_router, telemetry, AppState};
use stowage_core::{Config, MetadataBackend};
use stowage_metadata::{MemoryMetadataStore, MetadataStore, PostgresMetadataStore};
use stowage_processing::{ImageCodec, TransformPipeline};
use stowage_storage::{ContentStorage, LocalContentStorage, PresignSigner};

// Use mimalloc as the global allocator for better performance and lower
// fragmentation, especially when running on musl-based systems inside
// containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    telemetry::init_telemetry();

    let signer = PresignSigner::new(&config.presign_secret);
    let storage: Arc<dyn ContentStorage> = Arc::new(
        LocalContentStorage::new(&config.storage_root, config.public_url.clone(), signer)
            .await
            .map_err(|e| anyhow::anyhow!("failed to initialize content storage: {}", e))?,
    );

    let metadata: Arc<dyn MetadataStore> = match config.metadata_backend {
        MetadataBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(20)
                .connect(database_url)
                .await?;
            let store = PostgresMetadataStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("Metadata backend: postgres");
            Arc::new(store)
        }
        MetadataBackend::Memory => {
            tracing::info!("Metadata backend: memory");
            Arc::new(MemoryMetadataStore::new())
        }
    };

    let pipeline = TransformPipeline::new(ImageCodec::new(), config.max_concurrent_transforms);

    let addr = format!("{}:{}", config.bind_addr, config.server_port);
    let max_concurrent_transforms = config.max_concurrent_transforms;
    let state = AppState::new(config, metadata, storage, pipeline);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        max_concurrent_transforms,
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Listens for Ctrl+C (SIGINT) and SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
