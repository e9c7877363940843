use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::GatewayError;

/// Maximum age of a signed request before it is rejected as stale.
pub const MAX_AGE_SECS: i64 = 300;

/// Verifier for the inbound webhook signing scheme.
///
/// The signature over a request is
/// `"{version}={hex(HMAC-SHA256(secret, "{version}:{timestamp}:{body}"))}"`.
/// Verification succeeds or fails as an authorization error; there is no
/// boolean result for callers to mishandle.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    secret: String,
    version: String,
}

impl RequestSigner {
    pub fn new(secret: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            version: version.into(),
        }
    }

    /// Computes the signature for a body at the given timestamp.
    pub fn sign(&self, body: &str, timestamp: &str) -> Result<String, GatewayError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| GatewayError::internal("failed to initialize request signer"))?;
        mac.update(self.version.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body.as_bytes());
        let digest = mac.finalize().into_bytes();
        Ok(format!("{}={}", self.version, hex::encode(digest)))
    }

    /// Verifies signature and freshness of an inbound request.
    ///
    /// Requests older than [`MAX_AGE_SECS`] or dated in the future are
    /// rejected. All failure paths are [`GatewayError::Forbidden`], so a
    /// normal return always means the request verified.
    pub fn verify(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
            return Err(GatewayError::Forbidden("missing verification headers"));
        };

        let issued: i64 = timestamp
            .parse()
            .map_err(|_| GatewayError::Forbidden("request timestamp invalid"))?;
        let delta = now.timestamp() - issued;
        if delta > MAX_AGE_SECS {
            return Err(GatewayError::Forbidden("request timestamp is too old"));
        }
        if delta < 0 {
            return Err(GatewayError::Forbidden("request timestamp is in the future"));
        }

        let expected = self.sign(body, timestamp)?;
        if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
            Ok(())
        } else {
            Err(GatewayError::Forbidden("invalid signature"))
        }
    }
}
