//! Small helpers for pulling typed fields out of the loosely-typed
//! `arguments` object every tool call carries, producing the spec's
//! `missing_param`/`invalid_param` errors uniformly.

use gasoline_protocol::ToolError;
use serde_json::Value;

pub fn require_str<'a>(params: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::missing_param(name))
}

pub fn optional_str<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params.get(name).and_then(Value::as_str)
}

pub fn optional_u64(params: &Value, name: &str) -> Option<u64> {
    params.get(name).and_then(Value::as_u64)
}

pub fn optional_i64(params: &Value, name: &str) -> Option<i64> {
    params.get(name).and_then(Value::as_i64)
}

pub fn optional_bool(params: &Value, name: &str) -> Option<bool> {
    params.get(name).and_then(Value::as_bool)
}
