use chatlog_types::models::{ChatRecord, NewChatRecord};
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;

use crate::models::ChatRecordRow;
use crate::ticket::WriteTicket;
use crate::{RecordStore, StoreError};

impl RecordStore {
    /// Inserts one record in its own transaction and returns it as stored.
    ///
    /// The transaction rolls back on drop, so a failed insert leaves nothing
    /// behind and the connection is ready for the next call.
    pub fn append(&self, record: &NewChatRecord) -> Result<ChatRecord, StoreError> {
        self.with_conn(|conn| insert(conn, record))
    }

    /// Like [`RecordStore::append`], but gives up without inserting if
    /// `ticket` is cancelled while the write waits for the connection, and
    /// rolls back if it is cancelled mid-insert.
    pub fn append_with(&self, record: &NewChatRecord, ticket: &WriteTicket) -> Result<ChatRecord, StoreError> {
        self.with_conn(|conn| {
            if !ticket.begin(conn) {
                return Err(StoreError::Cancelled);
            }
            let result = insert(conn, record);
            ticket.finish();
            result
        })
    }

    pub fn count_records(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM chat_records", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    /// Most recent records first.
    pub fn recent_records(&self, limit: u32) -> Result<Vec<ChatRecord>, StoreError> {
        self.with_conn(|conn| query_recent(conn, limit))
    }
}

fn insert(conn: &mut Connection, record: &NewChatRecord) -> Result<ChatRecord, StoreError> {
    let tx = conn.transaction()?;
    let timestamp = Utc::now();

    tx.execute(
        "INSERT INTO chat_records (user_id, nickname, message, timestamp, group_id, is_bot_message)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            record.user_id,
            record.nickname,
            record.message,
            timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            record.group_id,
            record.is_bot_message,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    Ok(ChatRecord {
        id,
        user_id: record.user_id.clone(),
        nickname: record.nickname.clone(),
        message: record.message.clone(),
        timestamp,
        group_id: record.group_id.clone(),
        is_bot_message: record.is_bot_message,
    })
}

fn query_recent(conn: &Connection, limit: u32) -> Result<Vec<ChatRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, nickname, message, timestamp, group_id, is_bot_message
         FROM chat_records
         ORDER BY timestamp DESC, id DESC
         LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([limit], |row| {
            Ok(ChatRecordRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                nickname: row.get(2)?,
                message: row.get(3)?,
                timestamp: row.get(4)?,
                group_id: row.get(5)?,
                is_bot_message: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().map(ChatRecord::from).collect())
}
