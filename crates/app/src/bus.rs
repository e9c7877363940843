//! Event bus publisher.
//!
//! Posts `PutEvents` documents to the regional events endpoint, SigV4-signed
//! with the `events` service. The endpoint is injectable so tests can point
//! at a mock server. The publish response body is not inspected; any
//! non-success status is an internal failure.

use chrono::{DateTime, Utc};
use metrics::counter;
use reqwest::Client;
use serde_json::json;
use tracing::debug;
use url::Url;

use slackbot_edge_core::{BusEntry, GatewayError};

use crate::sigv4::{self, Credentials};

const SERVICE: &str = "events";
const SOURCE: &str = "slack.com";
const TARGET: &str = "AWSEvents.PutEvents";

#[derive(Clone)]
pub struct EventBridgeBus {
    http: Client,
    endpoint: Url,
    bus_name: String,
    region: String,
    credentials: Credentials,
}

impl EventBridgeBus {
    pub fn new(
        credentials: Credentials,
        bus_name: String,
        region: String,
        endpoint: Url,
        http: Client,
    ) -> Self {
        Self {
            http,
            endpoint,
            bus_name,
            region,
            credentials,
        }
    }

    /// Default regional endpoint for the configured bus region.
    pub fn regional_endpoint(region: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("https://events.{region}.amazonaws.com/"))
    }

    /// Publishes one entry onto the bus.
    pub async fn publish(&self, entry: BusEntry, now: DateTime<Utc>) -> Result<(), GatewayError> {
        let body = json!({
            "Entries": [{
                "EventBusName": self.bus_name,
                "Source": SOURCE,
                "DetailType": entry.detail_type,
                "Detail": entry.detail,
            }]
        })
        .to_string();

        debug!(stage = "bus", bus = %self.bus_name, "events:PutEvents {body}");

        let host = self
            .endpoint
            .host_str()
            .ok_or_else(|| GatewayError::internal("event bus endpoint has no host"))?
            .to_string();
        let signing_headers = sigv4::sign_request(
            "POST",
            &host,
            self.endpoint.path(),
            &[],
            &body,
            SERVICE,
            &self.region,
            &self.credentials,
            now,
        );

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header("content-type", "application/x-amz-json-1.1")
            .header("x-amz-target", TARGET);
        for (name, value) in signing_headers {
            request = request.header(&name, value);
        }

        let response = request.body(body).send().await.map_err(|err| {
            counter!("bus_publish_total", "result" => "error").increment(1);
            GatewayError::Internal(format!("event bus request failed: {err}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            counter!("bus_publish_total", "result" => "error").increment(1);
            return Err(GatewayError::Internal(format!(
                "event bus returned status {status}"
            )));
        }

        counter!("bus_publish_total", "result" => "ok").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use slackbot_edge_core::Discriminator;

    fn bus(endpoint: Url) -> EventBridgeBus {
        EventBridgeBus::new(
            Credentials {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "SECRET".to_string(),
                session_token: None,
            },
            "slackbot".to_string(),
            "us-east-1".to_string(),
            endpoint,
            Client::builder().build().expect("client"),
        )
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .expect("fixed time")
            .with_timezone(&Utc)
    }

    fn entry() -> BusEntry {
        let discriminator = Discriminator::Key("app_mention".to_string());
        BusEntry::new(
            Some("event_callback".to_string()),
            Some(&discriminator),
            Some(&json!({"type": "event_callback"})),
        )
        .expect("entry")
    }

    #[tokio::test]
    async fn publishes_a_single_sourced_entry() {
        let server = MockServer::start_async().await;
        let endpoint = Url::parse(&server.url("/")).expect("url");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("x-amz-target", "AWSEvents.PutEvents")
                    .header("content-type", "application/x-amz-json-1.1")
                    .header_exists("authorization")
                    .header_exists("x-amz-date")
                    .body_contains("\"EventBusName\":\"slackbot\"")
                    .body_contains("\"Source\":\"slack.com\"")
                    .body_contains("\"DetailType\":\"event_callback\"");
                then.status(200).json_body(json!({"FailedEntryCount": 0}));
            })
            .await;

        bus(endpoint)
            .publish(entry(), fixed_now())
            .await
            .expect("publish");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_internal() {
        let server = MockServer::start_async().await;
        let endpoint = Url::parse(&server.url("/")).expect("url");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(500);
            })
            .await;

        let err = bus(endpoint)
            .publish(entry(), fixed_now())
            .await
            .expect_err("should fail");
        assert!(matches!(err, GatewayError::Internal(_)));
    }
}
