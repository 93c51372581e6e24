//! Best-effort JSON recovery for model output
//!
//! Models asked for JSON still wrap it in code fences, add a sentence before
//! or after it, or put stray backslashes inside string values (emoticons,
//! Windows paths). This module undoes exactly those three things and nothing
//! more: anything else is reported as [`Error::MalformedResponse`].

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Characters that may legally follow a backslash inside a JSON string.
const JSON_ESCAPES: &[char] = &['"', '\\', '/', 'b', 'f', 'n', 'r', 't', 'u'];

/// Parse model output into a JSON object.
///
/// Strict parse first; on failure one repair pass escapes stray backslashes
/// and the strict parse is retried once.
pub fn parse_payload(raw: &str) -> Result<Map<String, Value>> {
    let candidate = narrow_to_object(strip_code_fence(raw));

    let strict_error = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return into_object(value),
        Err(e) => e,
    };

    let repaired = escape_stray_backslashes(candidate);
    if repaired == candidate {
        return Err(Error::MalformedResponse(strict_error.to_string()));
    }

    tracing::debug!("Strict JSON parse failed ({}), retrying with escaped backslashes", strict_error);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => into_object(value),
        Err(e) => Err(Error::MalformedResponse(format!(
            "{} (after backslash repair: {})",
            strict_error, e
        ))),
    }
}

/// [`parse_payload`] followed by deserialization into `T`.
pub fn parse_as<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let object = parse_payload(raw)?;
    serde_json::from_value(Value::Object(object))
        .map_err(|e| Error::MalformedResponse(format!("Unexpected JSON shape: {}", e)))
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(Error::MalformedResponse(format!(
            "Expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Remove a surrounding ```` ```lang ... ``` ```` fence, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Only the language tag (`json`, `JSON`, ...) is dropped; JSON may start on the fence line.
    let body = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Slice from the first `{` to the last `}`; the input unchanged if there is
/// no such pair.
fn narrow_to_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Double every backslash that does not start a valid JSON escape.
fn escape_stray_backslashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(next) if JSON_ESCAPES.contains(next) => {
                out.push('\\');
                out.push(*next);
                chars.next();
            }
            _ => out.push_str("\\\\"),
        }
    }

    out
}
