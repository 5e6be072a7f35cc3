//! JSON encoding used on the callable wire format.
//!
//! Callable backends speak plain JSON, except for 64-bit integers which cannot be carried
//! losslessly by a JavaScript number. Those travel as protobuf wrapper objects:
//! `{"@type": "type.googleapis.com/google.protobuf.Int64Value", "value": "9007199254740993"}`.

use serde_json::{Map, Number, Value as JsonValue};

use crate::functions::error::{internal_error, FunctionsResult};

pub const LONG_TYPE: &str = "type.googleapis.com/google.protobuf.Int64Value";
pub const UNSIGNED_LONG_TYPE: &str = "type.googleapis.com/google.protobuf.UInt64Value";

const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Encodes a caller supplied value for the request body.
pub fn encode(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Number(number) => encode_number(number),
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(encode).collect()),
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(key, value)| (key, encode(value)))
                .collect(),
        ),
        other => other,
    }
}

fn encode_number(number: Number) -> JsonValue {
    if let Some(signed) = number.as_i64() {
        if signed.unsigned_abs() > MAX_SAFE_INTEGER {
            return wrapper(LONG_TYPE, signed.to_string());
        }
    } else if let Some(unsigned) = number.as_u64() {
        return wrapper(UNSIGNED_LONG_TYPE, unsigned.to_string());
    }
    JsonValue::Number(number)
}

fn wrapper(type_url: &str, value: String) -> JsonValue {
    let mut map = Map::new();
    map.insert("@type".to_string(), JsonValue::String(type_url.to_string()));
    map.insert("value".to_string(), JsonValue::String(value));
    JsonValue::Object(map)
}

/// Decodes a response value, unwrapping 64-bit integer wrappers.
pub fn decode(value: JsonValue) -> FunctionsResult<JsonValue> {
    match value {
        JsonValue::Array(items) => items
            .into_iter()
            .map(decode)
            .collect::<FunctionsResult<Vec<_>>>()
            .map(JsonValue::Array),
        JsonValue::Object(map) => decode_object(map),
        other => Ok(other),
    }
}

fn decode_object(map: Map<String, JsonValue>) -> FunctionsResult<JsonValue> {
    match map.get("@type").and_then(JsonValue::as_str) {
        Some(LONG_TYPE) => {
            let raw = wrapped_value(&map)?;
            let parsed = raw.parse::<i64>().map_err(|err| {
                internal_error(format!("Data cannot be decoded from JSON: {raw} ({err})"))
            })?;
            Ok(JsonValue::Number(Number::from(parsed)))
        }
        Some(UNSIGNED_LONG_TYPE) => {
            let raw = wrapped_value(&map)?;
            let parsed = raw.parse::<u64>().map_err(|err| {
                internal_error(format!("Data cannot be decoded from JSON: {raw} ({err})"))
            })?;
            Ok(JsonValue::Number(Number::from(parsed)))
        }
        _ => map
            .into_iter()
            .map(|(key, value)| decode(value).map(|decoded| (key, decoded)))
            .collect::<FunctionsResult<Map<_, _>>>()
            .map(JsonValue::Object),
    }
}

fn wrapped_value(map: &Map<String, JsonValue>) -> FunctionsResult<&str> {
    map.get("value")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| internal_error("Data cannot be decoded from JSON: wrapper has no value"))
}
