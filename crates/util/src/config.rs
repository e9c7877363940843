use std::{env, fmt, net::SocketAddr};

/// Address the HTTP server binds to when `APP_BIND_ADDR` is not set.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

fn bind_address() -> Result<SocketAddr, std::net::AddrParseError> {
    let value = env::var("APP_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    value.parse()
}

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns `true` when the current environment should behave as development.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Slack-side secrets and OAuth settings, resolved once at startup.
///
/// The signing secret authenticates inbound webhooks; the OAuth client pair
/// authenticates the install handshake. Optional fields mirror the upstream
/// protocol: unset values are omitted from the authorize URL and the token
/// exchange payload.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub signing_secret: String,
    pub signing_version: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
    pub user_scope: Option<String>,
    pub redirect_uri: Option<String>,
    pub success_uri: Option<String>,
    pub error_uri: Option<String>,
    /// Base URL for the Slack Web API, overridable for tests.
    pub api_base: String,
    /// Base URL for the OAuth authorize page, overridable for tests.
    pub authorize_base: String,
}

/// Outbound signing credentials and event-bus coordinates.
///
/// These authenticate the gateway itself toward the backend API and the
/// event bus. They are a separate trust domain from [`SlackConfig`]'s
/// signing secret, which authenticates inbound callers.
#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub api_region: String,
    pub event_bus_name: String,
    pub event_bus_region: String,
    /// Explicit bus endpoint, overridable for tests. Defaults to the
    /// regional `events` endpoint when unset.
    pub event_bus_endpoint: Option<String>,
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub slack: SlackConfig,
    pub aws: AwsConfig,
}

const DEFAULT_SIGNING_VERSION: &str = "v0";
const DEFAULT_API_BASE: &str = "https://slack.com/api/";
const DEFAULT_AUTHORIZE_BASE: &str = "https://slack.com/oauth/v2/authorize";

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = bind_address().map_err(ConfigError::BindAddress)?;

        let slack = SlackConfig {
            signing_secret: required("SLACK_SIGNING_SECRET")?,
            signing_version: optional("SLACK_SIGNING_VERSION")
                .unwrap_or_else(|| DEFAULT_SIGNING_VERSION.to_string()),
            client_id: required("SLACK_OAUTH_CLIENT_ID")?,
            client_secret: required("SLACK_OAUTH_CLIENT_SECRET")?,
            scope: optional("SLACK_OAUTH_SCOPE"),
            user_scope: optional("SLACK_OAUTH_USER_SCOPE"),
            redirect_uri: optional("SLACK_OAUTH_REDIRECT_URI"),
            success_uri: optional("SLACK_OAUTH_SUCCESS_URI"),
            error_uri: optional("SLACK_OAUTH_ERROR_URI"),
            api_base: optional("SLACK_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            authorize_base: optional("SLACK_AUTHORIZE_BASE")
                .unwrap_or_else(|| DEFAULT_AUTHORIZE_BASE.to_string()),
        };

        let aws = AwsConfig {
            access_key_id: required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
            session_token: optional("AWS_SESSION_TOKEN"),
            api_region: required("AWS_API_REGION")?,
            event_bus_name: required("AWS_EVENT_BUS_NAME")?,
            event_bus_region: required("AWS_EVENT_BUS_REGION")?,
            event_bus_endpoint: optional("AWS_EVENT_BUS_ENDPOINT"),
        };

        Ok(Self {
            bind_addr,
            environment,
            slack,
            aws,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::MissingVariable(name))
}

fn optional(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    MissingVariable(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::MissingVariable(name) => {
                write!(f, "required environment variable {name} is not set")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
