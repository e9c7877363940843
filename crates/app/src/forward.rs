//! Request re-signer for the pass-through routes.
//!
//! Builds the forwarded copy of an inbound request: target URL recomputed
//! from the origin metadata, SigV4 headers for the backend API merged in
//! lower-cased, and the body descriptor replaced with the decoded payload.
//! The inbound request is never mutated, so a retried invocation observes
//! identical input.

use chrono::{DateTime, Utc};
use url::form_urlencoded;

use slackbot_edge_core::{BodyDescriptor, EdgeRequest, GatewayError, HeaderEntry};

use crate::sigv4::{self, Credentials};

const SERVICE: &str = "execute-api";

/// Produces the re-signed copy of `request` carrying `data` as its body.
pub fn resolve(
    request: &EdgeRequest,
    data: &str,
    credentials: &Credentials,
    region: &str,
    now: DateTime<Utc>,
) -> Result<EdgeRequest, GatewayError> {
    let origin = request
        .origin
        .as_ref()
        .and_then(|origin| origin.custom.as_ref())
        .ok_or_else(|| GatewayError::internal("request has no custom origin to forward to"))?;

    let path = format!("{}{}", origin.path, request.uri);
    let query: Vec<(String, String)> = form_urlencoded::parse(request.querystring.as_bytes())
        .into_owned()
        .collect();

    let signing_headers = sigv4::sign_request(
        &request.method,
        &origin.domain_name,
        &path,
        &query,
        data,
        SERVICE,
        region,
        credentials,
        now,
    );

    let mut forwarded = request.clone();
    for (name, value) in signing_headers {
        forwarded.headers.insert(
            name.clone(),
            vec![HeaderEntry { key: name, value }],
        );
    }
    forwarded.body = BodyDescriptor {
        action: "replace".to_string(),
        encoding: "text".to_string(),
        data: data.to_string(),
        input_truncated: request.body.input_truncated,
    };

    Ok(forwarded)
}
