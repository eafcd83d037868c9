//! Presigned-access validation.
//!
//! Re-derives the remaining validity window of a signed URL from its own
//! signed parameters (declared expiry seconds and issuance timestamp), never
//! from client-supplied state. The remainder bounds the `Cache-Control`
//! max-age of the response so intermediate caches cannot outlive the
//! signature.

use chrono::{DateTime, NaiveDateTime, Utc};
use stowage_core::AppError;
use stowage_storage::AMZ_DATE_FORMAT;

/// Remaining whole seconds of validity at `now`, or an error when the
/// parameters are malformed or the signature has already expired.
pub fn expires_in(
    x_amz_expires: &str,
    x_amz_date: &str,
    now: DateTime<Utc>,
) -> Result<i64, AppError> {
    let declared: i64 = x_amz_expires.parse().map_err(|e| {
        AppError::InvalidInput(format!("problem parsing X-Amz-Expires: {}", e))
    })?;

    let issued = NaiveDateTime::parse_from_str(x_amz_date, AMZ_DATE_FORMAT)
        .map_err(|e| AppError::InvalidInput(format!("problem parsing X-Amz-Date: {}", e)))?
        .and_utc();

    let remaining = issued.timestamp() + declared - now.timestamp();
    if remaining <= 0 {
        return Err(AppError::InvalidInput(
            "signature already expired".to_string(),
        ));
    }

    Ok(remaining)
}
