use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while expanding a redirect URL template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template references unknown placeholder {{{0}}}")]
    MissingKey(String),
    #[error("template has an unterminated placeholder")]
    Unterminated,
    #[error("no template configured ({0} is not set)")]
    MissingTemplate(&'static str),
}

/// Expands `{key}` placeholders from the given value map.
///
/// String values are inserted verbatim; everything else uses its JSON
/// rendering. A placeholder without a corresponding value is an error, like
/// the `str.format` contract the redirect templates were written against.
pub fn format_template(template: &str, values: &Map<String, Value>) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or(TemplateError::Unterminated)?;
        let key = &after[..close];
        let value = values
            .get(key)
            .ok_or_else(|| TemplateError::MissingKey(key.to_string()))?;
        match value {
            Value::String(text) => output.push_str(text),
            other => output.push_str(&other.to_string()),
        }
        rest = &after[close + 1..];
    }
    output.push_str(rest);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn expands_placeholders_in_order() {
        let result = format_template(
            "app://open?team={TEAM_ID}&app={APP_ID}",
            &values(&[
                ("TEAM_ID", json!("T123")),
                ("APP_ID", json!("A456")),
                ("CHANNEL_ID", json!("")),
            ]),
        )
        .expect("format");
        assert_eq!(result, "app://open?team=T123&app=A456");
    }

    #[test]
    fn non_string_values_use_json_rendering() {
        let result = format_template("err={ok}", &values(&[("ok", json!(false))])).expect("format");
        assert_eq!(result, "err=false");
    }

    #[test]
    fn missing_placeholder_is_an_error() {
        let err = format_template("x={missing}", &Map::new()).expect_err("must fail");
        assert!(matches!(err, TemplateError::MissingKey(key) if key == "missing"));
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        let err = format_template("x={missing", &Map::new()).expect_err("must fail");
        assert!(matches!(err, TemplateError::Unterminated));
    }

    #[test]
    fn literal_text_passes_through() {
        let result = format_template("https://example.com/ok", &Map::new()).expect("format");
        assert_eq!(result, "https://example.com/ok");
    }
}
