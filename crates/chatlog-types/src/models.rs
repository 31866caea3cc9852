use chrono::{DateTime, Utc};

/// Nickname stored on every bot-authored record.
pub const BOT_NICKNAME: &str = "LangBot";

/// User id stored on bot-authored records when the adapter does not expose one.
pub const DEFAULT_BOT_ID: &str = "bot";

/// A record as it is handed to the store. Id and timestamp are assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatRecord {
    pub user_id: String,
    pub nickname: Option<String>,
    pub message: String,
    pub group_id: String,
    pub is_bot_message: bool,
}

/// A persisted chat record. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub id: i64,
    pub user_id: String,
    pub nickname: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub group_id: String,
    pub is_bot_message: bool,
}
