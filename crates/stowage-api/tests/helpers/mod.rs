//! Shared scaffolding for API integration tests: an in-memory application
//! wired exactly like `main`, plus request/seeding helpers.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::BodyExt;
use std::sync::Arc;
use stowage_api::{build_router, AppState};
use stowage_core::models::FileMetadata;
use stowage_core::{Config, MetadataBackend};
use stowage_metadata::MemoryMetadataStore;
use stowage_processing::{ImageCodec, TransformPipeline};
use stowage_storage::{ContentStorage, MemoryContentStorage, PresignSigner};
use tower::ServiceExt;

pub const ADMIN_SECRET: &str = "test-admin-secret";
pub const PRESIGN_SECRET: &str = "test-presign-secret";
pub const PUBLIC_URL: &str = "http://localhost:8000";

pub struct TestApp {
    pub router: Router,
    pub metadata: Arc<MemoryMetadataStore>,
    pub storage: Arc<MemoryContentStorage>,
}

fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1".to_string(),
        server_port: 0,
        public_url: PUBLIC_URL.to_string(),
        metadata_backend: MetadataBackend::Memory,
        database_url: None,
        storage_root: "./data/test".to_string(),
        presign_secret: PRESIGN_SECRET.to_string(),
        admin_secret: ADMIN_SECRET.to_string(),
        max_concurrent_transforms: 3,
        cors_origins: vec!["*".to_string()],
    }
}

pub fn test_app() -> TestApp {
    let metadata = Arc::new(MemoryMetadataStore::new());
    let storage = Arc::new(MemoryContentStorage::new(
        PUBLIC_URL.to_string(),
        PresignSigner::new(PRESIGN_SECRET),
    ));
    let pipeline = TransformPipeline::new(ImageCodec::new(), 3);
    let state = AppState::new(test_config(), metadata.clone(), storage.clone(), pipeline);
    TestApp {
        router: build_router(state),
        metadata,
        storage,
    }
}

impl TestApp {
    /// Store bytes and a matching uploaded metadata row in one step,
    /// returning the row as served.
    pub async fn seed_file(
        &self,
        id: &str,
        name: &str,
        mime_type: &str,
        data: &[u8],
    ) -> FileMetadata {
        self.seed_file_in_bucket(id, name, mime_type, data, "default")
            .await
    }

    pub async fn seed_file_in_bucket(
        &self,
        id: &str,
        name: &str,
        mime_type: &str,
        data: &[u8],
        bucket_id: &str,
    ) -> FileMetadata {
        let etag = self
            .storage
            .put(id, mime_type, Bytes::copy_from_slice(data))
            .await
            .unwrap();
        let now = Utc::now();
        let file = FileMetadata {
            id: id.to_string(),
            name: name.to_string(),
            size: data.len() as i64,
            mime_type: mime_type.to_string(),
            etag,
            bucket_id: bucket_id.to_string(),
            is_uploaded: true,
            created_at: now,
            updated_at: now,
        };
        self.metadata.insert_file(file.clone()).await;
        file
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_with_header(&self, uri: &str, name: &str, value: &str) -> Response<Body> {
        self.request(
            Request::get(uri)
                .header(name, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_ops(&self, uri: &str, admin_secret: Option<&str>) -> Response<Body> {
        let mut builder = Request::post(uri);
        if let Some(secret) = admin_secret {
            builder = builder.header("x-admin-secret", secret);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// A small gradient PNG, big enough that downscaling visibly changes it.
pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_fn(
        width,
        height,
        |x, y| image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]),
    ));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}
