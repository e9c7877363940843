//! Slack API surface used by the gateway: OAuth v2 token exchange, install
//! link construction, stateless anti-forgery state tokens, and redirect URL
//! templating.

pub mod oauth;
pub mod state;
pub mod template;

pub use oauth::{OAuthError, OAuthSettings, SlackOAuthClient};
pub use state::{generate_state, verify_state};
pub use template::{format_template, TemplateError};
