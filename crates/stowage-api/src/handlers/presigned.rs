//! Presigned URL handlers.
//!
//! `GET /v1/files/{id}/presignedurl` mints a signed URL honouring the bucket
//! policy; `GET /v1/files/{id}/presignedurl/content` serves content through
//! one, verifying the signature before touching bytes and capping the
//! response's cache lifetime at the signature's remaining validity.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stowage_core::AppError;
use stowage_processing::TransformOptions;
use stowage_storage::PresignParams;

use crate::conditional::{check_conditionals, PreconditionHeaders};
use crate::error::{storage_error, transform_error, HttpAppError};
use crate::handlers::files::{fetch_file_metadata, FileResponse, TransformQuery};
use crate::presigned::expires_in;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PresignedUrlResponse {
    pub url: String,
    /// Validity window in seconds.
    pub expiration: i64,
}

/// Mint a presigned URL for a file, if its bucket allows them.
pub async fn get_presigned_url(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PresignedUrlResponse>, HttpAppError> {
    let (file, bucket) = fetch_file_metadata(&state, &id).await?;
    if !bucket.presigned_urls_enabled {
        return Err(HttpAppError(AppError::Forbidden(
            "presigned URLs are not enabled for this bucket".to_string(),
        )));
    }

    let url = state
        .storage
        .create_presigned_url(
            &file.id,
            Duration::from_secs(bucket.download_expiration as u64),
        )
        .await
        .map_err(storage_error)?;

    Ok(Json(PresignedUrlResponse {
        url,
        expiration: bucket.download_expiration,
    }))
}

/// Signed query parameters plus the optional transform parameters.
/// serde_urlencoded cannot flatten nested structs, so the transform fields
/// are repeated here.
#[derive(Debug, Deserialize)]
pub struct PresignedContentQuery {
    #[serde(rename = "X-Amz-Expires")]
    pub expires: String,
    #[serde(rename = "X-Amz-Date")]
    pub date: String,
    #[serde(rename = "X-Amz-Signature")]
    pub signature: String,
    pub w: Option<String>,
    pub h: Option<String>,
    pub q: Option<String>,
    pub b: Option<String>,
    pub f: Option<String>,
}

impl PresignedContentQuery {
    fn presign_params(&self) -> PresignParams {
        PresignParams {
            expires: self.expires.clone(),
            date: self.date.clone(),
            signature: self.signature.clone(),
        }
    }

    fn transform_query(&self) -> TransformQuery {
        TransformQuery {
            w: self.w.clone(),
            h: self.h.clone(),
            q: self.q.clone(),
            b: self.b.clone(),
            f: self.f.clone(),
        }
    }
}

/// Serve file content through a presigned URL.
///
/// The remaining validity window (derived from the signed parameters, not
/// client state) becomes the response's `Cache-Control` max-age so caches
/// cannot serve the object past the signature's life. Range requests are
/// honoured only when no transform is requested.
pub async fn get_presigned_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PresignedContentQuery>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let (file, _bucket) = fetch_file_metadata(&state, &id).await?;

    let remaining = expires_in(&query.expires, &query.date, Utc::now())?;
    let cache_control = format!("max-age={}", remaining);

    let options = query.transform_query().to_options()?;
    if !options.is_empty() && !TransformOptions::supports_mime_type(&file.mime_type) {
        return Err(HttpAppError(AppError::InvalidInput(format!(
            "image transformation features are not supported for '{}'",
            file.mime_type
        ))));
    }

    let range = if options.is_empty() {
        headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    } else {
        None
    };

    // Signature verification happens inside get_presigned, before any
    // conditional evaluation: an unsigned request must not learn whether a
    // cached copy is current.
    let object = state
        .storage
        .get_presigned(&id, &query.presign_params(), range.as_deref())
        .await
        .map_err(storage_error)?;

    let preconditions = PreconditionHeaders::from_headers(&headers);

    if options.is_empty() {
        let default_status = StatusCode::from_u16(object.status_code)
            .map_err(|_| AppError::Internal("invalid storage status code".to_string()))?;
        let status =
            check_conditionals(&file.etag, file.updated_at, &preconditions, default_status)?;
        if status != default_status {
            return Ok(FileResponse::headers_only(status, &file, &cache_control)
                .into_response()?);
        }
        let mut response = FileResponse::with_body(status, &file, &cache_control, object.body);
        response.content_range = object.content_range;
        return Ok(response.into_response()?);
    }

    let first_pass =
        check_conditionals(&file.etag, file.updated_at, &preconditions, StatusCode::OK)?;
    if first_pass != StatusCode::OK {
        return Ok(FileResponse::headers_only(first_pass, &file, &cache_control)
            .into_response()?);
    }

    let transformed = state
        .pipeline
        .transform(object.body, &file.mime_type, options)
        .await
        .map_err(transform_error)?;
    let derived = file.with_derived_content(
        transformed.size,
        transformed.etag,
        transformed.content_type,
    );

    let second_pass = check_conditionals(
        &derived.etag,
        derived.updated_at,
        &preconditions,
        StatusCode::OK,
    )?;
    if second_pass != StatusCode::OK {
        return Ok(FileResponse::headers_only(second_pass, &derived, &cache_control)
            .into_response()?);
    }

    Ok(FileResponse::with_body(
        StatusCode::OK,
        &derived,
        &cache_control,
        transformed.bytes,
    )
    .into_response()?)
}
