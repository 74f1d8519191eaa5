//! JSON encoding of values handed to the secret manager

use serde_json::Value;

use crate::error::SecretError;

/// Serialize a value into the string form stored by a backend
pub fn encode(value: &Value) -> Result<String, SecretError> {
    Ok(serde_json::to_string(value)?)
}

/// Parse a string read back from a backend
pub fn decode(raw: &str) -> Result<Value, SecretError> {
    Ok(serde_json::from_str(raw)?)
}
