//! Conditional-request evaluation.
//!
//! Pure implementation of the HTTP precondition protocol the gateway honours:
//! If-Match, If-None-Match, If-Modified-Since, If-Unmodified-Since, evaluated
//! strictly in that order with first-match-wins semantics. No I/O, no hidden
//! clock; deterministic given its inputs.

use axum::http::{header, HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use stowage_core::AppError;

/// Precondition headers extracted from one request.
#[derive(Debug, Clone, Default)]
pub struct PreconditionHeaders {
    pub if_match: Vec<String>,
    pub if_none_match: Vec<String>,
    pub if_modified_since: Option<String>,
    pub if_unmodified_since: Option<String>,
}

fn collect_etag_values(headers: &HeaderMap, name: header::HeaderName) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

impl PreconditionHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        PreconditionHeaders {
            if_match: collect_etag_values(headers, header::IF_MATCH),
            if_none_match: collect_etag_values(headers, header::IF_NONE_MATCH),
            if_modified_since: headers
                .get(header::IF_MODIFIED_SINCE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string()),
            if_unmodified_since: headers
                .get(header::IF_UNMODIFIED_SINCE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string()),
        }
    }
}

/// Exact string comparison, surrounding quotes included. No weak-comparison
/// semantics.
fn etag_found(etag: &str, candidates: &[String]) -> bool {
    candidates.iter().any(|c| c == etag)
}

/// Whether the resource changed strictly after the supplied HTTP date.
/// `updated_at` is truncated to whole seconds first so values echoed back
/// from a `Last-Modified` header round-trip exactly.
fn modified_after(updated_at: DateTime<Utc>, header_value: &str) -> Result<bool, AppError> {
    let wants = DateTime::parse_from_rfc2822(header_value)
        .map_err(|_| AppError::InvalidInput(format!("failed to parse date: {}", header_value)))?;
    Ok(updated_at.timestamp() > wants.timestamp())
}

/// Evaluate the request's preconditions against the representation about to
/// be returned.
///
/// Order is part of the contract: If-Match (412 on no match) wins over
/// If-None-Match (304 on match), which wins over If-Modified-Since (304 when
/// not strictly newer), which wins over If-Unmodified-Since (412 when
/// strictly newer). A malformed date is a client error, not a non-match.
pub fn check_conditionals(
    etag: &str,
    updated_at: DateTime<Utc>,
    headers: &PreconditionHeaders,
    default_status: StatusCode,
) -> Result<StatusCode, AppError> {
    if !headers.if_match.is_empty() && !etag_found(etag, &headers.if_match) {
        return Ok(StatusCode::PRECONDITION_FAILED);
    }

    if !headers.if_none_match.is_empty() && etag_found(etag, &headers.if_none_match) {
        return Ok(StatusCode::NOT_MODIFIED);
    }

    if let Some(ref since) = headers.if_modified_since {
        if !modified_after(updated_at, since)? {
            return Ok(StatusCode::NOT_MODIFIED);
        }
    }

    if let Some(ref since) = headers.if_unmodified_since {
        if modified_after(updated_at, since)? {
            return Ok(StatusCode::PRECONDITION_FAILED);
        }
    }

    Ok(default_status)
}
