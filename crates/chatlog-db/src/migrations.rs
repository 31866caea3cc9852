use rusqlite::Connection;
use tracing::info;

/// Creates the record schema if it does not exist yet. Safe to run on every start.
pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS chat_records (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         TEXT NOT NULL,
            nickname        TEXT,
            message         TEXT NOT NULL,
            timestamp       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            group_id        TEXT NOT NULL,
            is_bot_message  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_chat_records_group_time
            ON chat_records(group_id, timestamp);
        ",
    )?;

    info!("Record schema ready");
    Ok(())
}
