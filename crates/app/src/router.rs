use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use slackbot_edge_core::{RequestSigner, RouteTable};
use slackbot_edge_slack::SlackOAuthClient;

use crate::bus::EventBridgeBus;
use crate::sigv4::Credentials;
use crate::{handler, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    routes: Arc<RouteTable>,
    signer: RequestSigner,
    oauth: SlackOAuthClient,
    bus: EventBridgeBus,
    credentials: Arc<Credentials>,
    api_region: String,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        signer: RequestSigner,
        oauth: SlackOAuthClient,
        bus: EventBridgeBus,
        credentials: Credentials,
        api_region: String,
    ) -> Self {
        Self {
            metrics,
            routes: Arc::new(RouteTable::standard()),
            signer,
            oauth,
            bus,
            credentials: Arc::new(credentials),
            api_region,
            clock: Arc::new(Utc::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    pub fn oauth(&self) -> &SlackOAuthClient {
        &self.oauth
    }

    pub fn bus(&self) -> &EventBridgeBus {
        &self.bus
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn api_region(&self) -> &str {
        &self.api_region
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/edge", post(handler::handle))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::handler::tests::setup_state;

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = app_router(setup_state(None).await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(setup_state(None).await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }
}
