use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::app::Result;

static JSONP_PAYLOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^(]+\((.+)\)").expect("valid jsonp regex"));

/// Payload of a `callback({...})` response.
///
/// Companion endpoints are optional extras, so anything unparseable comes
/// back as an empty object rather than an error.
pub fn parse_jsonp(raw: &str) -> Value {
    let flat = raw.replace(['\r', '\n'], "");
    JSONP_PAYLOAD
        .captures(&flat)
        .and_then(|caps| caps.get(1))
        .and_then(|payload| serde_json::from_str(payload.as_str()).ok())
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// JSON embedded in a `<script>` tag. Sites emit raw control characters
/// inside string literals, which strict JSON rejects, so those go first.
pub fn parse_embedded_json(raw: &str) -> Result<Value> {
    let cleaned = raw.replace(['\r', '\n', '\t'], "");
    if cleaned.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_str(&cleaned)?)
}

/// Scalar JSON value as display text; `null` and containers become empty.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
