use serde::Deserialize;

use crate::id::{deserialize_id, deserialize_opt_id};
use crate::message::MessageChain;

/// A message received in a group conversation.
///
/// Ids default to empty when absent so that a malformed event reaches the
/// capture pipeline and is dropped there with a reason, rather than being
/// rejected wholesale by the transport.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupMessage {
    /// Group the message was posted in.
    #[serde(default, deserialize_with = "deserialize_id")]
    pub launcher_id: String,

    #[serde(default, deserialize_with = "deserialize_id")]
    pub sender_id: String,

    /// Display name supplied directly by the adapter.
    #[serde(default)]
    pub sender_name: Option<String>,

    /// Platform sender profile, consulted when `sender_name` is absent.
    #[serde(default)]
    pub sender: Option<SenderProfile>,

    #[serde(default)]
    pub message_chain: MessageChain,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SenderProfile {
    #[serde(default)]
    pub nickname: Option<String>,
    /// Group-specific display name.
    #[serde(default)]
    pub card: Option<String>,
}

/// A response produced by the bot.
#[derive(Debug, Clone, Deserialize)]
pub struct BotResponse {
    pub launcher_type: LauncherType,

    #[serde(default, deserialize_with = "deserialize_id")]
    pub launcher_id: String,

    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub response_text: Option<String>,

    /// Adapter the response goes out through, if the host knows it.
    #[serde(default)]
    pub adapter: Option<AdapterInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdapterInfo {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub bot_account_id: Option<String>,
}

/// Kind of conversation an event is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum LauncherType {
    Group,
    Person,
    Other(String),
}

impl LauncherType {
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group)
    }
}

impl From<String> for LauncherType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "group" => Self::Group,
            "person" => Self::Person,
            _ => Self::Other(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_message_from_adapter_json() {
        let event: GroupMessage = serde_json::from_value(json!({
            "launcher_id": 10001,
            "sender_id": "u1",
            "sender": {"card": "Ally"},
            "message_chain": "hello"
        }))
        .unwrap();

        assert_eq!(event.launcher_id, "10001");
        assert_eq!(event.sender_id, "u1");
        assert!(event.sender_name.is_none());
        assert_eq!(event.sender.unwrap().card.as_deref(), Some("Ally"));
        assert_eq!(event.message_chain, MessageChain::PlainText("hello".into()));
    }

    #[test]
    fn missing_chain_is_empty() {
        let event: GroupMessage = serde_json::from_value(json!({"launcher_id": "g"})).unwrap();
        assert_eq!(event.message_chain, MessageChain::Composite(vec![]));
        assert_eq!(event.sender_id, "");
    }

    #[test]
    fn bot_response_launcher_types() {
        let event: BotResponse = serde_json::from_value(json!({
            "launcher_type": "group",
            "launcher_id": "g1",
            "response_text": "hi",
            "adapter": {"bot_account_id": 42}
        }))
        .unwrap();
        assert!(event.launcher_type.is_group());
        assert_eq!(event.adapter.unwrap().bot_account_id.as_deref(), Some("42"));

        let event: BotResponse =
            serde_json::from_value(json!({"launcher_type": "person", "launcher_id": "u9"})).unwrap();
        assert_eq!(event.launcher_type, LauncherType::Person);

        let event: BotResponse =
            serde_json::from_value(json!({"launcher_type": "channel", "launcher_id": "c"})).unwrap();
        assert_eq!(event.launcher_type, LauncherType::Other("channel".into()));
    }
}
