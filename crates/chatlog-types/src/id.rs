//! Identifier coercion.
//!
//! Chat platforms hand out group and user ids as either strings or integers
//! depending on the adapter. Everything downstream compares ids as strings,
//! so they are coerced once at the deserialization boundary.

use std::collections::BTreeSet;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Canonical string form of a JSON identifier. `None` for arrays and objects.
pub fn canonical_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    canonical_id(&value).ok_or_else(|| D::Error::custom(format!("expected a string or numeric id, got {value}")))
}

pub fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = deserialize_id(deserializer)?;
    Ok(Some(id).filter(|s| !s.is_empty()))
}

/// Deserializes a list of ids (mixed strings and integers allowed) into a set.
pub fn deserialize_id_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .iter()
        .map(|v| canonical_id(v).ok_or_else(|| D::Error::custom(format!("invalid group id {v}"))))
        .collect()
}
