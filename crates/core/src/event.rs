use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::GatewayError;
use crate::route::RouteKind;
use crate::types::{BusEntry, Discriminator, EdgeRequest};

/// A classified inbound request: shared body/header/query extraction plus
/// per-kind payload and discriminator rules.
///
/// Discriminator computation is deliberately lenient — a missing key
/// degrades to a null discriminator and the event still publishes — while
/// body decoding and JSON parse failures propagate as internal errors.
pub struct SlackEvent<'a> {
    kind: RouteKind,
    request: &'a EdgeRequest,
}

impl<'a> SlackEvent<'a> {
    pub fn new(kind: RouteKind, request: &'a EdgeRequest) -> Self {
        Self { kind, request }
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    pub fn request(&self) -> &EdgeRequest {
        self.request
    }

    /// Decoded body text, per the descriptor's encoding tag.
    pub fn body(&self) -> Result<String, GatewayError> {
        let descriptor = &self.request.body;
        if descriptor.encoding.eq_ignore_ascii_case("base64") {
            let bytes = BASE64.decode(descriptor.data.as_bytes())?;
            String::from_utf8(bytes)
                .map_err(|_| GatewayError::internal("request body is not valid UTF-8"))
        } else {
            Ok(descriptor.data.clone())
        }
    }

    /// First value of the named header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, entries)| entries.first())
            .map(|entry| entry.value.as_str())
    }

    /// Query string as ordered pairs; duplicates are kept in order.
    pub fn query(&self) -> Vec<(String, String)> {
        form_urlencoded::parse(self.request.querystring.as_bytes())
            .into_owned()
            .collect()
    }

    /// Single-value query lookup. The last occurrence of a duplicated key
    /// shadows earlier ones.
    pub fn query_get(&self, name: &str) -> Option<String> {
        self.query()
            .into_iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Structured payload, decoder-specific:
    ///
    /// - Event/OAuth: body parsed as JSON, null when the body is empty;
    /// - Callback/Menu: URL-encoded form whose `payload` field holds JSON;
    /// - Slash: URL-encoded form as a flat string-valued object;
    /// - Health/Install: always null.
    pub fn payload(&self) -> Result<Option<Value>, GatewayError> {
        match self.kind {
            RouteKind::Health | RouteKind::Install => Ok(None),
            RouteKind::Event | RouteKind::OAuth => {
                let body = self.body()?;
                if body.is_empty() {
                    return Ok(None);
                }
                Ok(Some(serde_json::from_str(&body)?))
            }
            RouteKind::Callback | RouteKind::Menu => {
                let body = self.body()?;
                if body.is_empty() {
                    return Ok(None);
                }
                let wrapped = form_field(&body, "payload").ok_or_else(|| {
                    GatewayError::internal("interactive body has no payload field")
                })?;
                Ok(Some(serde_json::from_str(&wrapped)?))
            }
            RouteKind::Slash => {
                let body = self.body()?;
                let mut fields = Map::new();
                for (key, value) in form_urlencoded::parse(body.as_bytes()).into_owned() {
                    fields.insert(key, Value::String(value));
                }
                Ok(Some(Value::Object(fields)))
            }
        }
    }

    /// Bus detail type: constant for slash commands, the payload's top-level
    /// `type` otherwise (null when absent).
    pub fn detail_type(&self) -> Result<Option<String>, GatewayError> {
        if self.kind == RouteKind::Slash {
            return Ok(Some("slash_command".to_string()));
        }
        let payload = self.required_payload()?;
        Ok(payload
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Per-subtype discriminator. Missing keys yield `None`, never an error.
    pub fn discriminator(&self) -> Result<Option<Discriminator>, GatewayError> {
        let payload = self.required_payload()?;
        let discriminator = match self.kind {
            RouteKind::Event => payload
                .get("event")
                .and_then(|event| event.get("type"))
                .and_then(Value::as_str)
                .map(|value| Discriminator::Key(value.to_string())),
            RouteKind::Callback => callback_discriminator(&payload),
            RouteKind::Menu => key_discriminator(&payload, "action_id"),
            RouteKind::Slash => key_discriminator(&payload, "command"),
            RouteKind::Health | RouteKind::Install | RouteKind::OAuth => None,
        };
        Ok(discriminator)
    }

    /// Assembles the bus entry for this event.
    pub fn entry(&self) -> Result<BusEntry, GatewayError> {
        let detail_type = self.detail_type()?;
        let discriminator = self.discriminator()?;
        let payload = self.payload()?;
        BusEntry::new(detail_type, discriminator.as_ref(), payload.as_ref())
    }

    fn required_payload(&self) -> Result<Value, GatewayError> {
        self.payload()?
            .ok_or_else(|| GatewayError::internal("event payload is empty"))
    }
}

/// Interactive-callback discriminator table, keyed by the payload's `type`.
fn callback_discriminator(payload: &Value) -> Option<Discriminator> {
    match payload.get("type").and_then(Value::as_str) {
        Some("block_actions") => {
            let actions = payload.get("actions")?.as_array()?;
            let ids = actions
                .iter()
                .map(|action| {
                    action
                        .get("action_id")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .collect::<Option<Vec<_>>>()?;
            Some(Discriminator::Keys(ids))
        }
        Some("view_closed") | Some("view_submission") => payload
            .get("view")
            .and_then(|view| view.get("callback_id"))
            .and_then(Value::as_str)
            .map(|value| Discriminator::Key(value.to_string())),
        // interactive_message / message_action / shortcut
        _ => key_discriminator(payload, "callback_id"),
    }
}

fn key_discriminator(payload: &Value, key: &str) -> Option<Discriminator> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(|value| Discriminator::Key(value.to_string()))
}

/// Last value of a field in a URL-encoded form body.
fn form_field(body: &str, name: &str) -> Option<String> {
    form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value)
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BodyDescriptor, HeaderEntry};
    use serde_json::json;

    fn request(encoding: &str, data: &str, querystring: &str) -> EdgeRequest {
        EdgeRequest {
            body: BodyDescriptor {
                action: "read-only".to_string(),
                data: data.to_string(),
                encoding: encoding.to_string(),
                input_truncated: false,
            },
            headers: Default::default(),
            method: "POST".to_string(),
            origin: None,
            querystring: querystring.to_string(),
            uri: "/events".to_string(),
            extra: Default::default(),
        }
    }

    fn plain(data: &str) -> EdgeRequest {
        request("text", data, "")
    }

    fn form_body(payload: &Value) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", &payload.to_string())
            .finish()
    }

    #[test]
    fn decodes_base64_bodies() {
        let encoded = BASE64.encode("{\"type\":\"x\"}");
        let request = request("base64", &encoded, "");
        let event = SlackEvent::new(RouteKind::Event, &request);
        assert_eq!(event.body().expect("body"), "{\"type\":\"x\"}");
    }

    #[test]
    fn rejects_invalid_base64() {
        let request = request("base64", "!!!not base64!!!", "");
        let event = SlackEvent::new(RouteKind::Event, &request);
        assert!(matches!(event.body(), Err(GatewayError::Internal(_))));
    }

    #[test]
    fn header_lookup_is_case_insensitive_and_takes_first_value() {
        let mut request = plain("");
        request.headers.insert(
            "x-slack-signature".to_string(),
            vec![
                HeaderEntry {
                    key: "X-Slack-Signature".to_string(),
                    value: "v0=first".to_string(),
                },
                HeaderEntry {
                    key: "X-Slack-Signature".to_string(),
                    value: "v0=second".to_string(),
                },
            ],
        );
        let event = SlackEvent::new(RouteKind::Event, &request);
        assert_eq!(event.header("X-SLACK-SIGNATURE"), Some("v0=first"));
        assert_eq!(event.header("x-missing"), None);
    }

    #[test]
    fn query_lookup_lets_later_duplicates_win() {
        let request = request("text", "", "code=abc&state=s1&code=xyz");
        let event = SlackEvent::new(RouteKind::OAuth, &request);
        assert_eq!(event.query_get("code").as_deref(), Some("xyz"));
        assert_eq!(event.query().len(), 3);
    }

    #[test]
    fn event_payload_is_null_for_empty_body_and_json_otherwise() {
        let event_request = plain("");
        let event = SlackEvent::new(RouteKind::Event, &event_request);
        assert_eq!(event.payload().expect("payload"), None);

        let event_request = plain("{\"type\":\"event_callback\"}");
        let event = SlackEvent::new(RouteKind::Event, &event_request);
        assert_eq!(
            event.payload().expect("payload"),
            Some(json!({"type": "event_callback"}))
        );
    }

    #[test]
    fn malformed_json_propagates_as_internal() {
        let request = plain("{not json");
        let event = SlackEvent::new(RouteKind::Event, &request);
        assert!(matches!(event.payload(), Err(GatewayError::Internal(_))));
    }

    #[test]
    fn callback_without_payload_field_is_internal() {
        let request = plain("foo=bar");
        let event = SlackEvent::new(RouteKind::Callback, &request);
        assert!(matches!(event.payload(), Err(GatewayError::Internal(_))));
    }

    #[test]
    fn event_discriminator_reads_nested_event_type() {
        let request = plain("{\"type\":\"event_callback\",\"event\":{\"type\":\"app_mention\"}}");
        let event = SlackEvent::new(RouteKind::Event, &request);
        assert_eq!(event.detail_type().expect("type").as_deref(), Some("event_callback"));
        assert_eq!(
            event.discriminator().expect("discriminator"),
            Some(Discriminator::Key("app_mention".to_string()))
        );
    }

    #[test]
    fn url_verification_has_no_nested_event() {
        let request = plain("{\"type\":\"url_verification\",\"challenge\":\"abc\"}");
        let event = SlackEvent::new(RouteKind::Event, &request);
        assert_eq!(
            event.detail_type().expect("type").as_deref(),
            Some("url_verification")
        );
        assert_eq!(event.discriminator().expect("discriminator"), None);
    }

    #[test]
    fn block_actions_collects_ordered_action_ids() {
        let payload = json!({
            "type": "block_actions",
            "actions": [{"action_id": "x"}, {"action_id": "y"}]
        });
        let body = form_body(&payload);
        let request = plain(&body);
        let event = SlackEvent::new(RouteKind::Callback, &request);
        assert_eq!(
            event.discriminator().expect("discriminator"),
            Some(Discriminator::Keys(vec!["x".to_string(), "y".to_string()]))
        );
    }

    #[test]
    fn view_submission_uses_view_callback_id() {
        let payload = json!({
            "type": "view_submission",
            "view": {"callback_id": "c1"}
        });
        let body = form_body(&payload);
        let request = plain(&body);
        let event = SlackEvent::new(RouteKind::Callback, &request);
        assert_eq!(
            event.discriminator().expect("discriminator"),
            Some(Discriminator::Key("c1".to_string()))
        );
    }

    #[test]
    fn shortcut_falls_back_to_top_level_callback_id() {
        let payload = json!({"type": "shortcut", "callback_id": "open-modal"});
        let body = form_body(&payload);
        let request = plain(&body);
        let event = SlackEvent::new(RouteKind::Callback, &request);
        assert_eq!(
            event.discriminator().expect("discriminator"),
            Some(Discriminator::Key("open-modal".to_string()))
        );
    }

    #[test]
    fn missing_keys_degrade_to_null_but_entry_still_builds() {
        let payload = json!({"type": "block_actions", "actions": [{"no_id": true}]});
        let body = form_body(&payload);
        let request = plain(&body);
        let event = SlackEvent::new(RouteKind::Callback, &request);
        assert_eq!(event.discriminator().expect("discriminator"), None);

        let entry = event.entry().expect("entry");
        assert_eq!(entry.detail_type.as_deref(), Some("block_actions"));
        let detail: Value = serde_json::from_str(&entry.detail).expect("detail");
        assert_eq!(detail["discriminator"], Value::Null);
    }

    #[test]
    fn menu_uses_action_id() {
        let payload = json!({"type": "block_suggestion", "action_id": "pick-user"});
        let body = form_body(&payload);
        let request = plain(&body);
        let event = SlackEvent::new(RouteKind::Menu, &request);
        assert_eq!(
            event.discriminator().expect("discriminator"),
            Some(Discriminator::Key("pick-user".to_string()))
        );
    }

    #[test]
    fn slash_commands_flatten_form_fields() {
        let request = plain("command=%2Ffoo&text=hello+world&team_id=T1");
        let event = SlackEvent::new(RouteKind::Slash, &request);

        assert_eq!(event.detail_type().expect("type").as_deref(), Some("slash_command"));
        assert_eq!(
            event.discriminator().expect("discriminator"),
            Some(Discriminator::Key("/foo".to_string()))
        );
        assert_eq!(
            event.payload().expect("payload"),
            Some(json!({"command": "/foo", "text": "hello world", "team_id": "T1"}))
        );
    }

    #[test]
    fn slash_command_without_command_field_publishes_null_discriminator() {
        let request = plain("text=hello");
        let event = SlackEvent::new(RouteKind::Slash, &request);
        assert_eq!(event.discriminator().expect("discriminator"), None);
        let entry = event.entry().expect("entry");
        assert_eq!(entry.detail_type.as_deref(), Some("slash_command"));
    }
}
