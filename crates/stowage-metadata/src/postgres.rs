//! Postgres metadata store.
//!
//! Dynamic SQLx queries (no compile-time prepared statements, so builds do
//! not require a live DATABASE_URL). Schema lives in `migrations/` and is
//! applied with `run_migrations` at startup.

use crate::traits::{MetadataError, MetadataResult, MetadataStore, NewFile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use stowage_core::models::{BucketPolicy, FileMetadata, FileSummary};

#[derive(Clone)]
pub struct PostgresMetadataStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: String,
    name: String,
    size: i64,
    mime_type: String,
    etag: String,
    bucket_id: String,
    is_uploaded: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FileRow> for FileMetadata {
    fn from(row: FileRow) -> Self {
        FileMetadata {
            id: row.id,
            name: row.name,
            size: row.size,
            mime_type: row.mime_type,
            etag: row.etag,
            bucket_id: row.bucket_id,
            is_uploaded: row.is_uploaded,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BucketRow {
    id: String,
    min_upload_file: i64,
    max_upload_file: i64,
    presigned_urls_enabled: bool,
    download_expiration: i64,
    cache_control: String,
}

impl From<BucketRow> for BucketPolicy {
    fn from(row: BucketRow) -> Self {
        BucketPolicy {
            id: row.id,
            min_upload_file: row.min_upload_file,
            max_upload_file: row.max_upload_file,
            presigned_urls_enabled: row.presigned_urls_enabled,
            download_expiration: row.download_expiration,
            cache_control: row.cache_control,
        }
    }
}

fn backend_err(e: sqlx::Error) -> MetadataError {
    MetadataError::Backend(e.to_string())
}

impl PostgresMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> MetadataResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))
    }
}

#[async_trait]
impl MetadataStore for PostgresMetadataStore {
    async fn get_file_by_id(&self, id: &str) -> MetadataResult<FileMetadata> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, name, size, mime_type, etag, bucket_id, is_uploaded,
                   created_at, updated_at
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?;

        row.map(Into::into)
            .ok_or_else(|| MetadataError::FileNotFound(id.to_string()))
    }

    async fn get_bucket_by_id(&self, id: &str) -> MetadataResult<BucketPolicy> {
        let row = sqlx::query_as::<_, BucketRow>(
            r#"
            SELECT id, min_upload_file, max_upload_file, presigned_urls_enabled,
                   download_expiration, cache_control
            FROM buckets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?;

        row.map(Into::into)
            .ok_or_else(|| MetadataError::BucketNotFound(id.to_string()))
    }

    async fn list_files(&self) -> MetadataResult<Vec<FileSummary>> {
        #[derive(sqlx::FromRow)]
        struct SummaryRow {
            id: String,
            name: String,
            is_uploaded: bool,
            bucket_id: String,
        }

        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, name, is_uploaded, bucket_id FROM files ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(rows
            .into_iter()
            .map(|r| FileSummary {
                id: r.id,
                name: r.name,
                is_uploaded: r.is_uploaded,
                bucket_id: r.bucket_id,
            })
            .collect())
    }

    async fn delete_file_by_id(&self, id: &str) -> MetadataResult<()> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::FileNotFound(id.to_string()));
        }
        tracing::info!(file_id = %id, "Deleted metadata row");
        Ok(())
    }

    async fn initialize_file(&self, file: NewFile) -> MetadataResult<FileMetadata> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            INSERT INTO files (id, name, mime_type, bucket_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, size, mime_type, etag, bucket_id, is_uploaded,
                      created_at, updated_at
            "#,
        )
        .bind(&file.id)
        .bind(&file.name)
        .bind(&file.mime_type)
        .bind(&file.bucket_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                MetadataError::AlreadyExists(file.id.clone())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                MetadataError::BucketNotFound(file.bucket_id.clone())
            }
            _ => backend_err(e),
        })?;

        Ok(row.into())
    }

    async fn populate_metadata(
        &self,
        id: &str,
        size: i64,
        etag: &str,
        mime_type: &str,
    ) -> MetadataResult<FileMetadata> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            UPDATE files
            SET size = $2, etag = $3, mime_type = $4, is_uploaded = TRUE,
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, size, mime_type, etag, bucket_id, is_uploaded,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(size)
        .bind(etag)
        .bind(mime_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_err)?;

        row.map(Into::into)
            .ok_or_else(|| MetadataError::FileNotFound(id.to_string()))
    }
}
