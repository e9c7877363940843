use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GatewayError;

/// Event document handed to the gateway by the hosting edge runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeEvent {
    #[serde(rename = "Records")]
    pub records: Vec<EdgeRecord>,
}

impl EdgeEvent {
    /// Extracts the request carried by the first record.
    pub fn into_request(self) -> Result<EdgeRequest, GatewayError> {
        self.records
            .into_iter()
            .next()
            .map(|record| record.cf.request)
            .ok_or_else(|| GatewayError::internal("edge event carried no records"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub cf: EdgeRecordBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecordBody {
    pub request: EdgeRequest,
}

/// Header multimap as the edge runtime models it: lower-cased names mapping
/// to ordered `{key, value}` entries.
pub type HeaderMap = HashMap<String, Vec<HeaderEntry>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderEntry {
    #[serde(default)]
    pub key: String,
    pub value: String,
}

/// Inbound request as received. The re-signer produces a modified copy and
/// never mutates the original, so retries observe identical input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRequest {
    pub body: BodyDescriptor,
    pub headers: HeaderMap,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    pub querystring: String,
    pub uri: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDescriptor {
    #[serde(default)]
    pub action: String,
    pub data: String,
    pub encoding: String,
    #[serde(rename = "inputTruncated", default)]
    pub input_truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomOrigin>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomOrigin {
    #[serde(rename = "domainName")]
    pub domain_name: String,
    pub path: String,
    pub protocol: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Synthesized response returned to the edge runtime instead of forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeResponse {
    pub status: String,
    #[serde(rename = "statusDescription")]
    pub status_description: String,
    pub body: String,
    pub headers: HeaderMap,
}

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

impl EdgeResponse {
    /// Builds a response with the given status and optional JSON body.
    ///
    /// An absent body serializes to the empty string, not `{}`. The JSON
    /// content type is defaulted unless a later header overrides it.
    pub fn respond(code: u16, description: &str, body: Option<&Value>) -> Self {
        let body = match body {
            Some(value) => value.to_string(),
            None => String::new(),
        };
        let mut response = Self {
            status: code.to_string(),
            status_description: description.to_string(),
            body,
            headers: HeaderMap::new(),
        };
        response.set_header("content-type", CONTENT_TYPE_JSON);
        response
    }

    /// Builds the fixed `{"ok": false}` rejection body.
    pub fn reject(code: u16, description: &str) -> Self {
        Self::respond(code, description, Some(&serde_json::json!({"ok": false})))
    }

    /// Builds a 302 redirect to `location`.
    pub fn found(location: &str) -> Self {
        let mut response = Self::respond(302, "FOUND", None);
        response.set_header("location", location);
        response
    }

    /// Replaces the named header with a single value.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(
            name.to_string(),
            vec![HeaderEntry {
                key: name.to_string(),
                value: value.to_string(),
            }],
        );
    }
}

/// Result of one invocation: either a synthesized response, or the re-signed
/// request the edge runtime should forward to the backend origin.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Forward(Box<EdgeRequest>),
    Respond(EdgeResponse),
}

/// Sub-classification key attached to a published event. The shape varies
/// by subtype: `block_actions` carries the ordered `action_id` list, every
/// other subtype a single key. A missing key degrades to null upstream of
/// this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Discriminator {
    Key(String),
    Keys(Vec<String>),
}

#[derive(Debug, Serialize)]
struct EventDetail<'a> {
    discriminator: Option<&'a Discriminator>,
    payload: Option<&'a Value>,
}

/// One event-bus entry, consumed exactly once by the publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct BusEntry {
    pub detail_type: Option<String>,
    /// JSON-serialized `{discriminator, payload}` document.
    pub detail: String,
}

impl BusEntry {
    pub fn new(
        detail_type: Option<String>,
        discriminator: Option<&Discriminator>,
        payload: Option<&Value>,
    ) -> Result<Self, GatewayError> {
        let detail = serde_json::to_string(&EventDetail {
            discriminator,
            payload,
        })?;
        Ok(Self {
            detail_type,
            detail,
        })
    }
}
