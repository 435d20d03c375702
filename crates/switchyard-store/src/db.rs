use rusqlite::Connection;

use crate::error::Result;

/// Initialise the association and message-log tables.
///
/// Safe to call on every startup, uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS chat_assoc (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            master_uid  TEXT NOT NULL,
            slave_uid   TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_assoc_master
            ON chat_assoc(master_uid);

        CREATE TABLE IF NOT EXISTS msg_log (
            master_chat                 TEXT NOT NULL,
            master_msg_id               TEXT NOT NULL,
            text                        TEXT NOT NULL,
            msg_type                    TEXT NOT NULL,
            sent_to                     TEXT NOT NULL,
            slave_origin_uid            TEXT NOT NULL,
            slave_origin_display_name   TEXT NOT NULL,
            slave_member_uid            TEXT,
            slave_member_display_name   TEXT,
            created_at                  TEXT NOT NULL,
            updated                     INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (master_chat, master_msg_id)
        );
        CREATE INDEX IF NOT EXISTS idx_msg_log_recent
            ON msg_log(master_chat, created_at DESC);",
    )?;
    Ok(())
}
