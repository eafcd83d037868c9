//! Configuration module
//!
//! Environment-driven configuration for the gateway. `Config::from_env` reads
//! every setting from the process environment with sensible defaults for
//! local development; `main` loads `.env` via dotenvy before calling it.

use std::env;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_CONCURRENT_TRANSFORMS: usize = 3;

/// Which metadata backend to wire at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub server_port: u16,
    /// Public base URL used when building presigned URLs.
    pub public_url: String,
    pub metadata_backend: MetadataBackend,
    pub database_url: Option<String>,
    /// Root directory for the local content store.
    pub storage_root: String,
    /// Secret used to sign presigned URLs.
    pub presign_secret: String,
    /// Secret required by the `/ops` reconciliation endpoints.
    pub admin_secret: String,
    /// Hard cap on concurrent image transformations.
    pub max_concurrent_transforms: usize,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let server_port = env::var("STOWAGE_PORT")
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid STOWAGE_PORT: {}", e))?
            .unwrap_or(DEFAULT_PORT);

        let metadata_backend = match env::var("STOWAGE_METADATA_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => MetadataBackend::Postgres,
            "memory" => MetadataBackend::Memory,
            other => {
                return Err(anyhow::anyhow!(
                    "invalid STOWAGE_METADATA_BACKEND: {} (expected postgres or memory)",
                    other
                ))
            }
        };

        let database_url = env::var("DATABASE_URL").ok();
        if metadata_backend == MetadataBackend::Postgres && database_url.is_none() {
            return Err(anyhow::anyhow!(
                "DATABASE_URL is required when STOWAGE_METADATA_BACKEND=postgres"
            ));
        }

        let max_concurrent_transforms = env::var("STOWAGE_MAX_CONCURRENT_TRANSFORMS")
            .ok()
            .map(|v| v.parse::<usize>())
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid STOWAGE_MAX_CONCURRENT_TRANSFORMS: {}", e))?
            .unwrap_or(DEFAULT_MAX_CONCURRENT_TRANSFORMS);
        if max_concurrent_transforms == 0 {
            return Err(anyhow::anyhow!(
                "STOWAGE_MAX_CONCURRENT_TRANSFORMS must be at least 1"
            ));
        }

        let cors_origins = env::var("STOWAGE_CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Config {
            bind_addr: env::var("STOWAGE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port,
            public_url: env::var("STOWAGE_PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", server_port)),
            metadata_backend,
            database_url,
            storage_root: env::var("STOWAGE_STORAGE_ROOT")
                .unwrap_or_else(|_| "./data/content".to_string()),
            presign_secret: env::var("STOWAGE_PRESIGN_SECRET")
                .unwrap_or_else(|_| "stowage-dev-presign-secret".to_string()),
            admin_secret: env::var("STOWAGE_ADMIN_SECRET")
                .unwrap_or_else(|_| "stowage-dev-admin-secret".to_string()),
            max_concurrent_transforms,
            cors_origins,
        })
    }
}
