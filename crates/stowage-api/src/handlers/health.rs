//! Liveness and version endpoints.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub build_version: &'static str,
}

pub async fn healthz() -> &'static str {
    "OK"
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        build_version: env!("CARGO_PKG_VERSION"),
    })
}
