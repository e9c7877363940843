use thiserror::Error;

/// Failure taxonomy for a single gateway invocation.
///
/// `Forbidden` covers everything the caller is not told apart: unmatched
/// routes, missing or invalid verification headers, stale or future-dated
/// timestamps, and signature mismatches. `Internal` covers malformed
/// payloads and collaborator failures; detail is logged server-side and
/// never leaks into the response body.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("failed to parse payload: {err}"))
    }
}

impl From<base64::DecodeError> for GatewayError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Internal(format!("failed to decode request body: {err}"))
    }
}
