//! HMAC request signatures.
//!
//! Clients sign `METHOD:PATH:TIMESTAMP:BODY` with HMAC-SHA256 and send the
//! lowercase hex digest in `X-Request-Signature` plus the millisecond
//! timestamp in `X-Request-Timestamp`. An empty body is signed as `{}`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-request-signature";
pub const TIMESTAMP_HEADER: &str = "x-request-timestamp";

/// Default accepted clock skew: five minutes.
pub const DEFAULT_MAX_SKEW_MS: u64 = 300_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing request signature")]
    Missing,

    #[error("malformed request timestamp")]
    MalformedTimestamp,

    #[error("request expired")]
    Expired,

    #[error("invalid request signature")]
    Invalid,
}

impl SignatureError {
    /// Low-cardinality label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            SignatureError::Missing => "missing",
            SignatureError::MalformedTimestamp => "malformed_timestamp",
            SignatureError::Expired => "expired",
            SignatureError::Invalid => "invalid",
        }
    }
}

/// Signs and verifies requests with a shared secret.
#[derive(Clone)]
pub struct RequestVerifier {
    secret: Vec<u8>,
    max_skew_ms: u64,
}

impl std::fmt::Debug for RequestVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestVerifier")
            .field("max_skew_ms", &self.max_skew_ms)
            .finish_non_exhaustive()
    }
}

impl RequestVerifier {
    pub fn new(secret: impl AsRef<[u8]>, max_skew_ms: u64) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            max_skew_ms,
        }
    }

    /// Hex signature for a request.
    pub fn sign(&self, method: &str, path: &str, timestamp_ms: i64, body: &[u8]) -> String {
        self.mac(method, path, &timestamp_ms.to_string(), body)
            .map(hex::encode)
            .unwrap_or_default()
    }

    /// Check headers against the request. `now_ms` is the verifier's
    /// current time in Unix milliseconds.
    pub fn verify(
        &self,
        method: &str,
        path: &str,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now_ms: i64,
    ) -> Result<(), SignatureError> {
        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return Err(SignatureError::Missing);
        };

        let sent_ms: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::MalformedTimestamp)?;
        if now_ms.abs_diff(sent_ms) > self.max_skew_ms {
            return Err(SignatureError::Expired);
        }

        let provided = hex::decode(signature.trim()).map_err(|_| SignatureError::Invalid)?;
        let expected = self.mac(method, path, timestamp.trim(), body)?;
        if expected.ct_eq(&provided).unwrap_u8() == 0 {
            return Err(SignatureError::Invalid);
        }
        Ok(())
    }

    fn mac(&self, method: &str, path: &str, timestamp: &str, body: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let body: &[u8] = if body.is_empty() { b"{}" } else { body };
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::Invalid)?;
        mac.update(method.to_ascii_uppercase().as_bytes());
        mac.update(b":");
        mac.update(path.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
