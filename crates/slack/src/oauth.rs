use reqwest::{Client, Response, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::state::{generate_state, verify_state};
use crate::template::{format_template, TemplateError};

/// OAuth client settings and redirect URL templates, loaded once at startup.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
    pub user_scope: Option<String>,
    pub redirect_uri: Option<String>,
    pub success_uri: Option<String>,
    pub error_uri: Option<String>,
}

const DEFAULT_SUCCESS_URI: &str = "app://open?team={TEAM_ID}";

impl OAuthSettings {
    /// Expands the success redirect from a completed token exchange.
    ///
    /// Placeholders are `APP_ID`, `TEAM_ID`, and `CHANNEL_ID`, filled from
    /// `app_id`, `team.id`, and `incoming_webhook.channel_id`; absent fields
    /// expand to the empty string.
    pub fn success_location(&self, result: &Value) -> Result<String, TemplateError> {
        let template = self.success_uri.as_deref().unwrap_or(DEFAULT_SUCCESS_URI);
        let mut values = Map::new();
        values.insert(
            "APP_ID".to_string(),
            Value::String(string_at(result, &["app_id"])),
        );
        values.insert(
            "TEAM_ID".to_string(),
            Value::String(string_at(result, &["team", "id"])),
        );
        values.insert(
            "CHANNEL_ID".to_string(),
            Value::String(string_at(result, &["incoming_webhook", "channel_id"])),
        );
        format_template(template, &values)
    }

    /// Expands the error redirect with the given placeholder values.
    pub fn error_location(&self, values: &Map<String, Value>) -> Result<String, TemplateError> {
        let template = self
            .error_uri
            .as_deref()
            .ok_or(TemplateError::MissingTemplate("SLACK_OAUTH_ERROR_URI"))?;
        format_template(template, values)
    }

    /// Expands the error redirect for a single `{error}` placeholder.
    pub fn error_location_for(&self, error: &str) -> Result<String, TemplateError> {
        let mut values = Map::new();
        values.insert("error".to_string(), Value::String(error.to_string()));
        self.error_location(&values)
    }
}

fn string_at(value: &Value, path: &[&str]) -> String {
    let mut node = value;
    for key in path {
        match node.get(key) {
            Some(next) => node = next,
            None => return String::new(),
        }
    }
    node.as_str().map(str::to_string).unwrap_or_default()
}

/// Client for the Slack OAuth v2 surface. Base URLs are injectable so tests
/// can point at a mock server.
#[derive(Clone)]
pub struct SlackOAuthClient {
    http: Client,
    api_base: Url,
    authorize_url: Url,
    settings: OAuthSettings,
}

impl SlackOAuthClient {
    pub fn new(settings: OAuthSettings, api_base: Url, authorize_url: Url, http: Client) -> Self {
        Self {
            http,
            api_base,
            authorize_url,
            settings,
        }
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Builds the install link, minting a fresh state token for `timestamp`.
    /// Unset optional settings are omitted from the query.
    pub fn install_uri(&self, timestamp: i64) -> Url {
        let state = generate_state(&self.settings.client_secret, timestamp);
        let mut url = self.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.settings.client_id);
            if let Some(scope) = self.settings.scope.as_deref() {
                query.append_pair("scope", scope);
            }
            if let Some(user_scope) = self.settings.user_scope.as_deref() {
                query.append_pair("user_scope", user_scope);
            }
            query.append_pair("state", &state);
            if let Some(redirect_uri) = self.settings.redirect_uri.as_deref() {
                query.append_pair("redirect_uri", redirect_uri);
            }
        }
        url
    }

    /// Verifies a callback's anti-forgery state token.
    pub fn verify_state(&self, state: &str) -> bool {
        verify_state(&self.settings.client_secret, state)
    }

    /// Exchanges an authorization code for an access grant.
    ///
    /// Returns the raw response document: callers inspect `ok` and either
    /// publish the full grant or format an error redirect from its fields.
    pub async fn exchange_code(&self, code: Option<&str>) -> Result<Value, OAuthError> {
        let url = self.api_base.join("oauth.v2.access")?;
        let mut form: Vec<(&str, &str)> = Vec::new();
        if let Some(code) = code {
            form.push(("code", code));
        }
        form.push(("client_id", &self.settings.client_id));
        form.push(("client_secret", &self.settings.client_secret));
        if let Some(redirect_uri) = self.settings.redirect_uri.as_deref() {
            form.push(("redirect_uri", redirect_uri));
        }

        let response = self.http.post(url).form(&form).send().await?;
        parse_json(response).await
    }
}

/// Errors that can occur during OAuth interactions.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

async fn parse_json(response: Response) -> Result<Value, OAuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(OAuthError::Status { status, body });
    }

    Ok(response.json().await?)
}
