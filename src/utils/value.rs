use serde::de::{self, Deserialize, Deserializer};
use serde_json::Value;

/// Convert arbitrary JSON values into sanitized strings.
pub fn value_to_string(value: Value) -> String {
    let raw = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    };
    sanitize(raw)
}

fn sanitize(s: String) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

/// Accept both string and numeric identifiers and normalize them to a string.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        v @ (Value::String(_) | Value::Number(_)) => Ok(value_to_string(v)),
        other => Err(de::Error::custom(format!(
            "expected a string or numeric id, got {}",
            other
        ))),
    }
}

/// Pull a human-readable error message out of a JSON error body.
/// Prefers `message`, then `error`.
pub fn server_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "error"].iter().find_map(|key| {
        value
            .get(*key)
            .and_then(Value::as_str)
            .map(|s| sanitize(s.to_string()))
            .filter(|s| !s.trim().is_empty())
    })
}
