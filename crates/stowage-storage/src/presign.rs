//! Presigned URL signing and verification.
//!
//! URLs are signed with HMAC-SHA256 over `id \n expires \n date`. The
//! expiry window is carried in the URL itself (`X-Amz-Expires` seconds,
//! `X-Amz-Date` issuance timestamp in compact form) so validators re-derive
//! the remaining lifetime from the signed parameters rather than trusting
//! any client-supplied state.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::traits::{StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

/// Compact timestamp format used in signed URLs (e.g. `20260831T120000Z`).
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Signed query parameters extracted from a presigned URL.
#[derive(Debug, Clone)]
pub struct PresignParams {
    /// Declared validity window in seconds (`X-Amz-Expires`).
    pub expires: String,
    /// Issuance timestamp (`X-Amz-Date`).
    pub date: String,
    /// Hex HMAC-SHA256 signature (`X-Amz-Signature`).
    pub signature: String,
}

#[derive(Clone)]
pub struct PresignSigner {
    secret: Vec<u8>,
}

impl PresignSigner {
    pub fn new(secret: &str) -> Self {
        PresignSigner {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn compute(&self, id: &str, expires: &str, date: &str) -> String {
        // HMAC accepts keys of any length; new_from_slice cannot fail for SHA-256.
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC-SHA256 accepts keys of any length");
        mac.update(id.as_bytes());
        mac.update(b"\n");
        mac.update(expires.as_bytes());
        mac.update(b"\n");
        mac.update(date.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Sign access to `id` for `expires_secs` starting at `now`.
    pub fn sign(&self, id: &str, expires_secs: i64, now: DateTime<Utc>) -> PresignParams {
        let expires = expires_secs.to_string();
        let date = now.format(AMZ_DATE_FORMAT).to_string();
        let signature = self.compute(id, &expires, &date);
        PresignParams {
            expires,
            date,
            signature,
        }
    }

    /// Verify a signature in constant time. Expiry is not checked here; the
    /// access validator re-derives the remaining window separately.
    pub fn verify(&self, id: &str, params: &PresignParams) -> StorageResult<()> {
        let expected = self.compute(id, &params.expires, &params.date);
        let matches: bool = expected
            .as_bytes()
            .ct_eq(params.signature.as_bytes())
            .into();
        if !matches {
            return Err(StorageError::InvalidSignature(
                "signature mismatch".to_string(),
            ));
        }
        Ok(())
    }
}

impl PresignParams {
    /// Render as URL query string.
    pub fn to_query(&self) -> String {
        format!(
            "X-Amz-Expires={}&X-Amz-Date={}&X-Amz-Signature={}",
            self.expires, self.date, self.signature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sign_verify_round_trip() {
        let signer = PresignSigner::new("secret");
        let now = Utc.with_ymd_and_hms(2026, 8, 31, 12, 0, 0).unwrap();
        let params = signer.sign("file-1", 600, now);
        assert_eq!(params.date, "20260831T120000Z");
        assert_eq!(params.expires, "600");
        signer.verify("file-1", &params).unwrap();
    }

    #[test]
    fn test_verify_rejects_tampered_id() {
        let signer = PresignSigner::new("secret");
        let params = signer.sign("file-1", 600, Utc::now());
        let err = signer.verify("file-2", &params).unwrap_err();
        assert!(matches!(err, StorageError::InvalidSignature(_)));
    }

    #[test]
    fn test_verify_rejects_extended_expiry() {
        let signer = PresignSigner::new("secret");
        let mut params = signer.sign("file-1", 600, Utc::now());
        params.expires = "999999".to_string();
        assert!(signer.verify("file-1", &params).is_err());
    }

    #[test]
    fn test_different_secrets_do_not_cross_verify() {
        let a = PresignSigner::new("secret-a");
        let b = PresignSigner::new("secret-b");
        let params = a.sign("file-1", 600, Utc::now());
        assert!(b.verify("file-1", &params).is_err());
    }
}
