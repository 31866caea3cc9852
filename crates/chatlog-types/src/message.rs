use serde::Deserialize;
use serde_json::{Map, Value};

/// Inbound message payload.
///
/// Adapters deliver message chains in several incompatible shapes. The
/// conversion from JSON is total: anything that is not one of the structured
/// shapes lands in [`MessageChain::Opaque`] instead of failing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum MessageChain {
    /// Ordered sequence of components (`{"messages": [...]}`).
    Composite(Vec<SubPart>),
    /// A single component exposing a text field (`{"text": "..."}`).
    DirectText(String),
    /// A bare string.
    PlainText(String),
    /// Any other shape.
    Opaque(Value),
}

/// One component of a composite chain.
#[derive(Debug, Clone, PartialEq)]
pub enum SubPart {
    /// Component with a primary text field.
    Text(String),
    /// Component with a secondary `content` field of any type.
    Content(Value),
    /// A bare string inside the chain.
    Raw(String),
    /// Images, mentions, quotes and anything else without text.
    Other(Value),
}

impl Default for MessageChain {
    /// An empty chain.
    fn default() -> Self {
        Self::Composite(Vec::new())
    }
}

impl From<Value> for MessageChain {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::PlainText(s),
            Value::Object(mut map) => match map.remove("messages") {
                Some(Value::Array(parts)) => {
                    Self::Composite(parts.into_iter().map(SubPart::from).collect())
                }
                Some(other) => {
                    map.insert("messages".into(), other);
                    Self::from_text_field(map)
                }
                None => Self::from_text_field(map),
            },
            other => Self::Opaque(other),
        }
    }
}

impl MessageChain {
    fn from_text_field(mut map: Map<String, Value>) -> Self {
        match map.remove("text") {
            Some(Value::String(text)) => Self::DirectText(text),
            Some(other) => {
                map.insert("text".into(), other);
                Self::Opaque(Value::Object(map))
            }
            None => Self::Opaque(Value::Object(map)),
        }
    }
}

impl From<Value> for SubPart {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Raw(s),
            Value::Object(mut map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    return Self::Text(text.clone());
                }
                match map.remove("content") {
                    Some(content) => Self::Content(content),
                    None => Self::Other(Value::Object(map)),
                }
            }
            other => Self::Other(other),
        }
    }
}

impl From<&str> for MessageChain {
    fn from(text: &str) -> Self {
        Self::PlainText(text.to_owned())
    }
}
