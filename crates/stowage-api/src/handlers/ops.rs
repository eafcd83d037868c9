//! Operator reconciliation endpoints.
//!
//! All `/v1/ops` routes require the admin secret in `X-Admin-Secret`,
//! compared in constant time. List endpoints are read-only; delete endpoints
//! reuse the same classification and then apply sequential deletes.

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;
use stowage_core::models::FileSummary;
use stowage_core::AppError;
use subtle::ConstantTimeEq;

use crate::error::HttpAppError;
use crate::reconcile::ReconciliationEngine;
use crate::state::AppState;

const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

#[derive(Debug, Serialize)]
pub struct FilesReport {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MetadataReport {
    pub metadata: Vec<FileSummary>,
}

fn require_admin(headers: &HeaderMap, admin_secret: &str) -> Result<(), AppError> {
    let provided = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let authorized: bool = provided
        .as_bytes()
        .ct_eq(admin_secret.as_bytes())
        .into();
    if !authorized {
        return Err(AppError::Unauthorized(
            "incorrect admin secret".to_string(),
        ));
    }
    Ok(())
}

fn engine(state: &AppState) -> ReconciliationEngine {
    ReconciliationEngine::new(state.metadata.clone(), state.storage.clone())
}

pub async fn list_orphans(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FilesReport>, HttpAppError> {
    require_admin(&headers, &state.config.admin_secret)?;
    let files = engine(&state).list_orphans().await?;
    Ok(Json(FilesReport { files }))
}

pub async fn delete_orphans(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FilesReport>, HttpAppError> {
    require_admin(&headers, &state.config.admin_secret)?;
    let files = engine(&state).delete_orphans().await?;
    Ok(Json(FilesReport { files }))
}

pub async fn list_broken_metadata(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MetadataReport>, HttpAppError> {
    require_admin(&headers, &state.config.admin_secret)?;
    let metadata = engine(&state).list_broken_metadata().await?;
    Ok(Json(MetadataReport { metadata }))
}

pub async fn delete_broken_metadata(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MetadataReport>, HttpAppError> {
    require_admin(&headers, &state.config.admin_secret)?;
    let metadata = engine(&state).delete_broken_metadata().await?;
    Ok(Json(MetadataReport { metadata }))
}

pub async fn list_not_uploaded(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MetadataReport>, HttpAppError> {
    require_admin(&headers, &state.config.admin_secret)?;
    let metadata = engine(&state).list_not_uploaded().await?;
    Ok(Json(MetadataReport { metadata }))
}
