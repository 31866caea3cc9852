use chatlog_types::models::ChatRecord;
use chrono::{DateTime, Utc};
use tracing::warn;

/// Row shape of `chat_records`. Timestamps are stored as RFC 3339 text.
pub struct ChatRecordRow {
    pub id: i64,
    pub user_id: String,
    pub nickname: Option<String>,
    pub message: String,
    pub timestamp: String,
    pub group_id: String,
    pub is_bot_message: bool,
}

impl From<ChatRecordRow> for ChatRecord {
    fn from(row: ChatRecordRow) -> Self {
        let timestamp = row
            .timestamp
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|e| {
                warn!("Corrupt timestamp '{}' on record {}: {}", row.timestamp, row.id, e);
                DateTime::default()
            });

        ChatRecord {
            id: row.id,
            user_id: row.user_id,
            nickname: row.nickname,
            message: row.message,
            timestamp,
            group_id: row.group_id,
            is_bot_message: row.is_bot_message,
        }
    }
}
