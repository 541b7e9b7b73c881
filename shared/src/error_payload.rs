//! Flattening of server error payloads into one displayable line.

use serde_json::Value;

/// Message shown when a failed save carries nothing readable.
pub const FALLBACK_SAVE_MESSAGE: &str = "Failed to save";

const MESSAGE_KEYS: [&str; 5] = ["detail", "message", "error", "msg", "errors"];
const MAX_DEPTH: usize = 4;

/// Turns whatever the server put in an error body into a single string.
///
/// Strings pass through. Objects are searched for the usual message keys;
/// validation lists are rendered entry by entry (`loc: msg`) and joined with
/// `"; "`. Any other object is shown as its JSON text.
pub fn flatten_error_payload(payload: &Value) -> String {
    flatten(payload, 0)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| FALLBACK_SAVE_MESSAGE.to_string())
}

fn flatten(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
        return Some(value.to_string());
    }
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(entries) => {
            let parts: Vec<String> = entries
                .iter()
                .filter_map(|entry| flatten_entry(entry, depth + 1))
                .filter(|part| !part.trim().is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        },
        Value::Object(object) => {
            let found = MESSAGE_KEYS
                .iter()
                .filter_map(|key| object.get(*key))
                .find_map(|inner| flatten(inner, depth + 1));
            found.or_else(|| (!object.is_empty()).then(|| value.to_string()))
        },
    }
}

fn flatten_entry(entry: &Value, depth: usize) -> Option<String> {
    let Some(object) = entry.as_object() else {
        return flatten(entry, depth);
    };
    let message = ["msg", "message", "detail"]
        .iter()
        .find_map(|key| object.get(*key).and_then(|inner| flatten(inner, depth + 1)));
    let Some(message) = message else {
        return flatten(entry, depth);
    };
    match object.get("loc").map(render_location) {
        Some(location) if !location.is_empty() => Some(format!("{location}: {message}")),
        _ => Some(message),
    }
}

fn render_location(loc: &Value) -> String {
    match loc {
        Value::Array(parts) => parts
            .iter()
            .map(|part| match part {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("."),
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn plain_strings_pass_through() {
        assert_eq!(flatten_error_payload(&json!("Title is required")), "Title is required");
        assert_eq!(flatten_error_payload(&json!({ "detail": "Not allowed" })), "Not allowed");
        assert_eq!(flatten_error_payload(&json!({ "message": "Bad slug" })), "Bad slug");
    }

    #[test]
    fn validation_lists_are_joined() {
        let payload = json!({ "detail": [
            { "loc": ["body", "title"], "msg": "field required", "type": "value_error.missing" },
            { "loc": ["body", "state"], "msg": "invalid value" },
            { "msg": "body too large" }
        ] });
        assert_eq!(
            flatten_error_payload(&payload),
            "body.title: field required; body.state: invalid value; body too large"
        );
    }

    #[test]
    fn nested_objects_fall_back_to_json_text() {
        let payload = json!({ "detail": { "code": 42 } });
        assert_eq!(flatten_error_payload(&payload), r#"{"code":42}"#);
    }

    #[test]
    fn nothing_usable_yields_fallback() {
        assert_eq!(flatten_error_payload(&Value::Null), FALLBACK_SAVE_MESSAGE);
        assert_eq!(flatten_error_payload(&json!({})), FALLBACK_SAVE_MESSAGE);
        assert_eq!(flatten_error_payload(&json!({ "detail": "   " })), FALLBACK_SAVE_MESSAGE);
        assert_eq!(flatten_error_payload(&json!([])), FALLBACK_SAVE_MESSAGE);
    }
}
