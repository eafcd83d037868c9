//! File read handlers.
//!
//! `GET /v1/files/{id}` serves a file's content (or a derived image variant
//! of it); axum answers HEAD on the same route with the body stripped, which
//! is the info endpoint. Preconditions are evaluated twice when a transform
//! is requested: once against the stored descriptor before any bytes are
//! fetched, and again against the derived descriptor before responding, so
//! `If-Match` pinned to a pre-transform checksum fails even though the stored
//! row matched.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use stowage_core::models::{BucketPolicy, FileMetadata};
use stowage_core::AppError;
use stowage_processing::{OutputFormat, TransformOptions};

use crate::conditional::{check_conditionals, PreconditionHeaders};
use crate::error::{metadata_error, storage_error, transform_error, HttpAppError};
use crate::state::AppState;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Raw transform query parameters. Kept as strings so a bad value yields a
/// parameter-specific 400 instead of axum's generic deserialization reject.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformQuery {
    pub w: Option<String>,
    pub h: Option<String>,
    pub q: Option<String>,
    pub b: Option<String>,
    pub f: Option<String>,
}

fn parse_int_param<T: std::str::FromStr>(
    value: Option<&String>,
    name: &str,
) -> Result<Option<T>, AppError> {
    match value {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            AppError::InvalidInput(format!("query parameter {} must be an int", name))
        }),
    }
}

impl TransformQuery {
    pub fn to_options(&self) -> Result<TransformOptions, AppError> {
        let quality: Option<u8> = parse_int_param(self.q.as_ref(), "q")?;
        if let Some(q) = quality {
            if q > 100 {
                return Err(AppError::InvalidInput(
                    "query parameter q must be between 0 and 100".to_string(),
                ));
            }
        }
        let blur = match self.b.as_ref() {
            None => None,
            Some(raw) => Some(raw.parse::<f32>().map_err(|_| {
                AppError::InvalidInput("query parameter b must be a number".to_string())
            })?),
        };
        let format = match self.f.as_ref() {
            None => None,
            Some(raw) => Some(
                OutputFormat::parse(raw)
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?,
            ),
        };
        Ok(TransformOptions {
            width: parse_int_param(self.w.as_ref(), "w")?,
            height: parse_int_param(self.h.as_ref(), "h")?,
            blur,
            quality,
            format,
        })
    }
}

/// Fetch the file row and its bucket policy, enforcing the public-read
/// invariant: rows that are not fully uploaded are never served.
pub async fn fetch_file_metadata(
    state: &AppState,
    id: &str,
) -> Result<(FileMetadata, BucketPolicy), AppError> {
    let file = state
        .metadata
        .get_file_by_id(id)
        .await
        .map_err(metadata_error)?;
    if !file.is_uploaded {
        return Err(AppError::Forbidden("file not uploaded".to_string()));
    }
    let bucket = state
        .metadata
        .get_bucket_by_id(&file.bucket_id)
        .await
        .map_err(metadata_error)?;
    Ok((file, bucket))
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

/// Response writer for file reads. Caching headers are always present so 304
/// and 412 responses still let caches revalidate; entity headers and the body
/// only accompany success.
pub struct FileResponse {
    pub status: StatusCode,
    pub cache_control: String,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
    pub name: String,
    pub content_type: String,
    pub content_length: i64,
    pub content_range: Option<String>,
    pub body: Option<Bytes>,
}

impl FileResponse {
    pub fn headers_only(
        status: StatusCode,
        file: &FileMetadata,
        cache_control: &str,
    ) -> Self {
        FileResponse {
            status,
            cache_control: cache_control.to_string(),
            etag: file.etag.clone(),
            last_modified: file.updated_at,
            name: file.name.clone(),
            content_type: file.mime_type.clone(),
            content_length: file.size,
            content_range: None,
            body: None,
        }
    }

    pub fn with_body(
        status: StatusCode,
        file: &FileMetadata,
        cache_control: &str,
        body: Bytes,
    ) -> Self {
        FileResponse {
            body: Some(body),
            ..FileResponse::headers_only(status, file, cache_control)
        }
    }

    pub fn into_response(self) -> Result<Response, AppError> {
        let mut builder = Response::builder()
            .status(self.status)
            .header(header::CACHE_CONTROL, &self.cache_control)
            .header(header::ETAG, &self.etag)
            .header(header::LAST_MODIFIED, http_date(self.last_modified))
            .header(header::ACCEPT_RANGES, "bytes");

        let serves_entity =
            self.status == StatusCode::OK || self.status == StatusCode::PARTIAL_CONTENT;
        if serves_entity {
            builder = builder
                .header(header::CONTENT_TYPE, &self.content_type)
                .header(header::CONTENT_LENGTH, self.content_length)
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("inline; filename=\"{}\"", self.name),
                );
            if let Some(ref content_range) = self.content_range {
                builder = builder.header(header::CONTENT_RANGE, content_range);
            }
        }

        let body = match (serves_entity, self.body) {
            (true, Some(bytes)) => Body::from(bytes),
            _ => Body::empty(),
        };
        builder
            .body(body)
            .map_err(|e| AppError::Internal(format!("failed to build response: {}", e)))
    }
}

/// `GET /v1/files/{id}` with optional `w`/`h`/`q`/`b`/`f` transform
/// parameters. HEAD on the same route returns the identical headers.
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TransformQuery>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let (file, bucket) = fetch_file_metadata(&state, &id).await?;

    // Validate the transform request before evaluating preconditions: a
    // malformed query is a 400 even when the client also sent a matching
    // If-None-Match.
    let options = query.to_options()?;
    if !options.is_empty() && !TransformOptions::supports_mime_type(&file.mime_type) {
        return Err(HttpAppError(AppError::InvalidInput(format!(
            "image transformation features are not supported for '{}'",
            file.mime_type
        ))));
    }

    let preconditions = PreconditionHeaders::from_headers(&headers);

    // First pass against the stored descriptor: a terminal verdict means no
    // content fetch and no transform work at all.
    let first_pass =
        check_conditionals(&file.etag, file.updated_at, &preconditions, StatusCode::OK)?;
    if first_pass != StatusCode::OK {
        return Ok(FileResponse::headers_only(first_pass, &file, &bucket.cache_control)
            .into_response()?);
    }

    let object = state.storage.get(&id, None).await.map_err(storage_error)?;

    if options.is_empty() {
        return Ok(
            FileResponse::with_body(StatusCode::OK, &file, &bucket.cache_control, object.body)
                .into_response()?,
        );
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

    // Second pass against the derived descriptor. An If-Match pinned to the
    // stored checksum must fail here even though the first pass accepted it.
    let second_pass = check_conditionals(
        &derived.etag,
        derived.updated_at,
        &preconditions,
        StatusCode::OK,
    )?;
    if second_pass != StatusCode::OK {
        return Ok(
            FileResponse::headers_only(second_pass, &derived, &bucket.cache_control)
                .into_response()?,
        );
    }

    Ok(FileResponse::with_body(
        StatusCode::OK,
        &derived,
        &bucket.cache_control,
        transformed.bytes,
    )
    .into_response()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_options_empty_query() {
        let opts = TransformQuery::default().to_options().unwrap();
        assert!(opts.is_empty());
    }

    #[test]
    fn test_to_options_parses_all_fields() {
        let query = TransformQuery {
            w: Some("100".to_string()),
            h: Some("80".to_string()),
            q: Some("75".to_string()),
            b: Some("2.5".to_string()),
            f: Some("webp".to_string()),
        };
        let opts = query.to_options().unwrap();
        assert_eq!(opts.width, Some(100));
        assert_eq!(opts.height, Some(80));
        assert_eq!(opts.quality, Some(75));
        assert_eq!(opts.blur, Some(2.5));
        assert_eq!(opts.format, Some(OutputFormat::WebP));
    }

    #[test]
    fn test_to_options_rejects_non_numeric_width() {
        let query = TransformQuery {
            w: Some("wide".to_string()),
            ..Default::default()
        };
        let err = query.to_options().unwrap_err();
        assert!(err.to_string().contains("query parameter w must be an int"));
    }

    #[test]
    fn test_to_options_rejects_quality_out_of_range() {
        let query = TransformQuery {
            q: Some("101".to_string()),
            ..Default::default()
        };
        assert!(query.to_options().is_err());
    }

    #[test]
    fn test_to_options_rejects_unknown_format() {
        let query = TransformQuery {
            f: Some("avif".to_string()),
            ..Default::default()
        };
        assert!(query.to_options().is_err());
    }

    #[test]
    fn test_http_date_is_rfc1123() {
        use chrono::TimeZone;
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(http_date(at), "Thu, 15 Jan 2026 10:30:00 GMT");
    }
}
