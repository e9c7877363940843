mod bus;
mod forward;
mod handler;
mod install;
mod router;
mod sigv4;
mod telemetry;

use std::net::SocketAddr;

use reqwest::Client;
use tracing::info;
use url::Url;

use slackbot_edge_core::RequestSigner;
use slackbot_edge_slack::{OAuthSettings, SlackOAuthClient};
use slackbot_edge_util::{load_env_file, AppConfig};

use bus::EventBridgeBus;
use sigv4::Credentials;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let http = Client::builder().build()?;

    let slack = &config.slack;
    let settings = OAuthSettings {
        client_id: slack.client_id.clone(),
        client_secret: slack.client_secret.clone(),
        scope: slack.scope.clone(),
        user_scope: slack.user_scope.clone(),
        redirect_uri: slack.redirect_uri.clone(),
        success_uri: slack.success_uri.clone(),
        error_uri: slack.error_uri.clone(),
    };
    let oauth = SlackOAuthClient::new(
        settings,
        Url::parse(&slack.api_base)?,
        Url::parse(&slack.authorize_base)?,
        http.clone(),
    );

    let aws = &config.aws;
    let credentials = Credentials {
        access_key_id: aws.access_key_id.clone(),
        secret_access_key: aws.secret_access_key.clone(),
        session_token: aws.session_token.clone(),
    };
    let endpoint = match &aws.event_bus_endpoint {
        Some(endpoint) => Url::parse(endpoint)?,
        None => EventBridgeBus::regional_endpoint(&aws.event_bus_region)?,
    };
    let bus = EventBridgeBus::new(
        credentials.clone(),
        aws.event_bus_name.clone(),
        aws.event_bus_region.clone(),
        endpoint,
        http,
    );

    let signer = RequestSigner::new(
        slack.signing_secret.clone(),
        slack.signing_version.clone(),
    );
    let state = router::AppState::new(
        metrics,
        signer,
        oauth,
        bus,
        credentials,
        aws.api_region.clone(),
    );

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
