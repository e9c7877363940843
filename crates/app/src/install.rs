//! OAuth install handshake.
//!
//! Every terminal state resolves to a redirect location: explicit denials
//! and state mismatches go to the error template, a completed exchange
//! publishes the grant and goes to the success template. Only template
//! formatting failures surface as internal errors.

use metrics::counter;
use serde_json::Value;
use tracing::{error, warn};

use slackbot_edge_core::{BusEntry, Discriminator, GatewayError, SlackEvent};
use slackbot_edge_slack::TemplateError;

use crate::router::AppState;

pub async fn complete(state: &AppState, event: &SlackEvent<'_>) -> Result<String, GatewayError> {
    let oauth = state.oauth();
    let settings = oauth.settings();

    if let Some(error) = event.query_get("error") {
        warn!(stage = "oauth", error = %error, "authorization was denied");
        counter!("oauth_install_total", "result" => "denied").increment(1);
        return redirect(settings.error_location_for(&error));
    }

    let token = event.query_get("state").unwrap_or_default();
    if !oauth.verify_state(&token) {
        error!(stage = "oauth", "invalid state parameter");
        counter!("oauth_install_total", "result" => "bad_state").increment(1);
        return redirect(settings.error_location_for("Invalid state parameter"));
    }

    let code = event.query_get("code");
    let result = match oauth.exchange_code(code.as_deref()).await {
        Ok(result) => result,
        Err(err) => {
            error!(stage = "oauth", error = %err, "token exchange failed");
            counter!("oauth_install_total", "result" => "exchange_error").increment(1);
            return redirect(settings.error_location_for("Could not read OAuth response"));
        }
    };

    if !result.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        error!(stage = "oauth", response = %result, "token exchange was not accepted");
        counter!("oauth_install_total", "result" => "rejected").increment(1);
        let values = result.as_object().cloned().unwrap_or_default();
        return redirect(settings.error_location(&values));
    }

    let discriminator = Discriminator::Key("install".to_string());
    let entry = BusEntry::new(Some("oauth".to_string()), Some(&discriminator), Some(&result))?;
    state.bus().publish(entry, state.now()).await?;

    counter!("oauth_install_total", "result" => "ok").increment(1);
    redirect(settings.success_location(&result))
}

fn redirect(location: Result<String, TemplateError>) -> Result<String, GatewayError> {
    location.map_err(|err| GatewayError::Internal(format!("failed to format redirect: {err}")))
}
