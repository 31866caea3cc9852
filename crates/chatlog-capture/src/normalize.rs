use chatlog_types::message::{MessageChain, SubPart};
use serde_json::Value;

/// Flattens a message payload into plain text.
///
/// Total over every shape: composites concatenate the text of their parts in
/// order, single-text shapes are used verbatim, and anything unrecognized is
/// rendered as compact JSON. Returns an empty string when there is no text.
pub fn normalize(chain: &MessageChain) -> String {
    match chain {
        MessageChain::Composite(parts) => parts.iter().filter_map(part_text).collect(),
        MessageChain::DirectText(text) | MessageChain::PlainText(text) => text.clone(),
        MessageChain::Opaque(Value::String(s)) => s.clone(),
        MessageChain::Opaque(value) => value.to_string(),
    }
}

fn part_text(part: &SubPart) -> Option<&str> {
    match part {
        SubPart::Text(text) => Some(text.as_str()),
        SubPart::Content(Value::String(content)) => Some(content.as_str()),
        SubPart::Raw(raw) => Some(raw.as_str()),
        SubPart::Content(_) | SubPart::Other(_) => None,
    }
}
