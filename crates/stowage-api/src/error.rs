//! HTTP error response conversion.
//!
//! Every collaborator error is mapped to an `AppError` kind exactly once,
//! here; handlers never derive status codes from message text. The
//! `HttpAppError` wrapper renders the kind as a JSON body plus an `X-Error`
//! header carrying the public message, so HEAD responses (which cannot carry
//! a body) still expose it.

use axum::{
    http::{header::HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stowage_core::{AppError, ErrorMetadata, LogLevel};
use stowage_metadata::MetadataError;
use stowage_processing::TransformError;
use stowage_storage::StorageError;

pub static X_ERROR: HeaderName = HeaderName::from_static("x-error");

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
}

/// Wrapper type for AppError to implement IntoResponse.
/// Needed because of orphan rules: IntoResponse is axum's trait and
/// AppError lives in stowage-core.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<MetadataError> for HttpAppError {
    fn from(err: MetadataError) -> Self {
        HttpAppError(metadata_error(err))
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(storage_error(err))
    }
}

impl From<TransformError> for HttpAppError {
    fn from(err: TransformError) -> Self {
        HttpAppError(transform_error(err))
    }
}

/// Metadata-store errors → AppError kinds. Identifiers beyond the requested
/// one never leak into public messages.
pub fn metadata_error(err: MetadataError) -> AppError {
    match err {
        MetadataError::FileNotFound(_) => AppError::NotFound("file not found".to_string()),
        MetadataError::BucketNotFound(_) => AppError::NotFound("bucket not found".to_string()),
        MetadataError::AlreadyExists(_) => {
            AppError::InvalidInput("file already exists".to_string())
        }
        MetadataError::Backend(detail) => AppError::Metadata(detail),
    }
}

/// Content-store errors → AppError kinds.
pub fn storage_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(_) => AppError::NotFound("file not found".to_string()),
        StorageError::InvalidKey(_) => AppError::InvalidInput("invalid file id".to_string()),
        StorageError::InvalidRange(detail) => {
            AppError::InvalidInput(format!("invalid range: {}", detail))
        }
        StorageError::InvalidSignature(_) => {
            AppError::Forbidden("you are not authorized".to_string())
        }
        StorageError::Backend(detail) => AppError::Storage(detail),
        StorageError::Io(e) => AppError::Storage(e.to_string()),
    }
}

/// Transform-pipeline errors → AppError kinds. Unsupported mime type is the
/// client's fault; anything else means previously-valid stored bytes failed
/// to process.
pub fn transform_error(err: TransformError) -> AppError {
    match err {
        TransformError::UnsupportedMimeType(_) => AppError::InvalidInput(err.to_string()),
        TransformError::Processing(detail) => AppError::ImageProcessing(detail),
        TransformError::Task(detail) => AppError::Internal(detail),
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Request failed");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let error = self.0;
        log_error(&error);

        let status = StatusCode::from_u16(error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = error.client_message();

        let mut response = (
            status,
            Json(ErrorResponse {
                error: message.clone(),
                code: error.error_code().to_string(),
            }),
        )
            .into_response();

        if let Ok(value) = message.parse() {
            response.headers_mut().insert(X_ERROR.clone(), value);
        }
        response
    }
}
