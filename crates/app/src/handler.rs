//! Gateway orchestrator for the `POST /edge` invoke surface.
//!
//! Route → verify → publish → forward/respond. Failures map to the fixed
//! edge responses: `Forbidden` is a 403 and `Internal` a 500, both with the
//! `{"ok": false}` body, so callers learn nothing about why a request was
//! refused.

use std::time::Instant;

use axum::{extract::State, Json};
use metrics::{counter, histogram};
use serde_json::{json, Value};
use tracing::{error, warn};

use slackbot_edge_core::{EdgeEvent, EdgeResponse, GatewayError, Outcome, RouteKind, SlackEvent};

use crate::router::AppState;
use crate::{forward, install};

const SIGNATURE_HEADER: &str = "x-slack-signature";
const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

pub async fn handle(State(state): State<AppState>, Json(value): Json<Value>) -> Json<Outcome> {
    let start = Instant::now();
    let outcome = match invoke(&state, value).await {
        Ok(outcome) => {
            counter!("gateway_requests_total", "result" => "ok").increment(1);
            outcome
        }
        Err(GatewayError::Forbidden(reason)) => {
            warn!(stage = "gateway", reason, "request rejected");
            counter!("gateway_requests_total", "result" => "forbidden").increment(1);
            counter!("gateway_rejected_total", "status" => "403").increment(1);
            Outcome::Respond(EdgeResponse::reject(403, "FORBIDDEN"))
        }
        Err(GatewayError::Internal(message)) => {
            error!(stage = "gateway", error = %message, "request failed");
            counter!("gateway_requests_total", "result" => "internal").increment(1);
            counter!("gateway_rejected_total", "status" => "500").increment(1);
            Outcome::Respond(EdgeResponse::reject(500, "INTERNAL SERVER ERROR"))
        }
    };
    histogram!("gateway_ack_latency_seconds").record(start.elapsed().as_secs_f64());
    Json(outcome)
}

async fn invoke(state: &AppState, value: Value) -> Result<Outcome, GatewayError> {
    let event: EdgeEvent = serde_json::from_value(value)?;
    let request = event.into_request()?;
    let kind = state
        .routes()
        .resolve(&request.method, &request.uri)
        .ok_or(GatewayError::Forbidden("no route matched"))?;
    counter!("gateway_routes_total", "route" => route_label(kind)).increment(1);

    let event = SlackEvent::new(kind, &request);
    match kind {
        RouteKind::Health => forward_signed(state, &event),
        RouteKind::Install => {
            let location = state.oauth().install_uri(state.now().timestamp());
            Ok(Outcome::Respond(EdgeResponse::found(location.as_str())))
        }
        RouteKind::OAuth => {
            let location = install::complete(state, &event).await?;
            Ok(Outcome::Respond(EdgeResponse::found(&location)))
        }
        RouteKind::Event => {
            verify(state, &event)?;
            publish(state, &event).await?;
            Ok(Outcome::Respond(acknowledge(&event)?))
        }
        RouteKind::Callback | RouteKind::Menu | RouteKind::Slash => {
            verify(state, &event)?;
            publish(state, &event).await?;
            forward_signed(state, &event)
        }
    }
}

fn verify(state: &AppState, event: &SlackEvent<'_>) -> Result<(), GatewayError> {
    let body = event.body()?;
    state.signer().verify(
        event.header(SIGNATURE_HEADER),
        event.header(TIMESTAMP_HEADER),
        &body,
        state.now(),
    )
}

async fn publish(state: &AppState, event: &SlackEvent<'_>) -> Result<(), GatewayError> {
    let entry = event.entry()?;
    state.bus().publish(entry, state.now()).await
}

/// Re-signs the request for the backend API, carrying the decoded payload
/// re-serialized as the forwarded body.
fn forward_signed(state: &AppState, event: &SlackEvent<'_>) -> Result<Outcome, GatewayError> {
    let data = event
        .payload()?
        .map(|payload| payload.to_string())
        .unwrap_or_default();
    let forwarded = forward::resolve(
        event.request(),
        &data,
        state.credentials(),
        state.api_region(),
        state.now(),
    )?;
    Ok(Outcome::Forward(Box::new(forwarded)))
}

/// The 200 acknowledgement for the events route, echoing the challenge on
/// first-time URL verification.
fn acknowledge(event: &SlackEvent<'_>) -> Result<EdgeResponse, GatewayError> {
    let payload = event.payload()?;
    let body = payload
        .as_ref()
        .filter(|payload| payload.get("type").and_then(Value::as_str) == Some("url_verification"))
        .map(|payload| json!({"challenge": payload.get("challenge").cloned().unwrap_or(Value::Null)}));
    Ok(EdgeResponse::respond(200, "OK", body.as_ref()))
}

fn route_label(kind: RouteKind) -> &'static str {
    match kind {
        RouteKind::Health => "health",
        RouteKind::Install => "install",
        RouteKind::OAuth => "oauth",
        RouteKind::Callback => "callback",
        RouteKind::Event => "event",
        RouteKind::Menu => "menu",
        RouteKind::Slash => "slash",
    }
}
