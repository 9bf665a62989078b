//! YAML helpers for the cloudflared configuration document
//!
//! Works on `serde_yaml::Value` so that keys the operator does not own keep
//! their values and their original order across a parse/serialize cycle.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

/// Error type for YAML parsing
#[derive(Debug, Clone)]
pub struct YamlError(String);

impl std::fmt::Display for YamlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for YamlError {}

/// Parse a YAML string into a generic value.
pub fn parse_value(input: &str) -> Result<Value, YamlError> {
    serde_yaml::from_str(input).map_err(|e| YamlError(e.to_string()))
}

/// Parse a YAML string whose top level must be a mapping.
pub fn parse_mapping(input: &str) -> Result<Mapping, YamlError> {
    match parse_value(input)? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Err(YamlError("document is empty".to_string())),
        other => Err(YamlError(format!(
            "expected a mapping at the top level, found {}",
            kind_of(&other)
        ))),
    }
}

/// Serialize any value to a YAML string in block style.
pub fn to_yaml_string<T: Serialize + ?Sized>(value: &T) -> Result<String, YamlError> {
    serde_yaml::to_string(value).map_err(|e| YamlError(e.to_string()))
}

/// Convert a serializable value into a generic YAML value.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, YamlError> {
    serde_yaml::to_value(value).map_err(|e| YamlError(e.to_string()))
}

/// Set `key` in the mapping. An existing key keeps its position; a new key
/// is appended.
pub fn set_key(map: &mut Mapping, key: &str, value: Value) {
    map.insert(Value::String(key.to_string()), value);
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
