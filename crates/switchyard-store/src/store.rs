use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use switchyard_core::{ChatKey, MessageKind};
use tracing::{debug, instrument};

use crate::error::{Result, StoreError};
use crate::types::{ChatAssociation, MessageLogEntry, SentTo};

const ENTRY_COLUMNS: &str = "master_chat, master_msg_id, text, msg_type, sent_to,
     slave_origin_uid, slave_origin_display_name, slave_member_uid,
     slave_member_display_name, created_at, updated";

/// Thread-safe handle over the chat associations and the message log.
///
/// Wraps a single SQLite connection in a `Mutex`. Every call commits before
/// returning.
pub struct AssociationStore {
    db: Mutex<Connection>,
}

impl AssociationStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Fresh in-memory store with the schema applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        crate::db::init_db(&conn)?;
        Ok(Self::new(conn))
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Master chat the slave chat is linked to, if any.
    #[instrument(skip(self), fields(slave = %slave))]
    pub fn get_master_chat(&self, slave: &ChatKey) -> Result<Option<ChatKey>> {
        let db = self.conn();
        let master: Option<String> = db
            .query_row(
                "SELECT master_uid FROM chat_assoc WHERE slave_uid = ?1",
                rusqlite::params![slave.to_string()],
                |r| r.get(0),
            )
            .optional()?;
        master.map(|m| parse_key(&m)).transpose()
    }

    /// First slave chat linked to `master`, by link order.
    #[instrument(skip(self), fields(master = %master))]
    pub fn get_slave_chat(&self, master: &ChatKey) -> Result<Option<ChatKey>> {
        Ok(self.get_slave_chats(master)?.into_iter().next())
    }

    #[instrument(skip(self), fields(master = %master))]
    pub fn get_slave_chats(&self, master: &ChatKey) -> Result<Vec<ChatKey>> {
        let db = self.conn();
        let mut stmt =
            db.prepare("SELECT slave_uid FROM chat_assoc WHERE master_uid = ?1 ORDER BY id")?;
        let rows = stmt.query_map(rusqlite::params![master.to_string()], |r| {
            r.get::<_, String>(0)
        })?;
        let mut slaves = Vec::new();
        for row in rows {
            slaves.push(parse_key(&row?)?);
        }
        Ok(slaves)
    }

    /// Link `slave` to `master`.
    ///
    /// Re-adding an identical pair is a no-op. A slave already linked to a
    /// different master yields [`StoreError::Conflict`].
    #[instrument(skip(self), fields(master = %master, slave = %slave))]
    pub fn add_association(&self, master: &ChatKey, slave: &ChatKey) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT master_uid FROM chat_assoc WHERE slave_uid = ?1",
                rusqlite::params![slave.to_string()],
                |r| r.get(0),
            )
            .optional()?;
        match existing {
            Some(current) if current == master.to_string() => {
                debug!("association already present");
                return Ok(());
            }
            Some(current) => {
                return Err(StoreError::Conflict {
                    slave: slave.to_string(),
                    existing: current,
                })
            }
            None => {}
        }
        tx.execute(
            "INSERT INTO chat_assoc (master_uid, slave_uid, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![master.to_string(), slave.to_string(), timestamp(Utc::now())],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Unlink `slave` from whatever master it points at. No-op when unlinked.
    #[instrument(skip(self), fields(slave = %slave))]
    pub fn remove_association(&self, slave: &ChatKey) -> Result<()> {
        let db = self.conn();
        let removed = db.execute(
            "DELETE FROM chat_assoc WHERE slave_uid = ?1",
            rusqlite::params![slave.to_string()],
        )?;
        debug!(removed, "association removed");
        Ok(())
    }

    /// All links, oldest first.
    pub fn list_associations(&self) -> Result<Vec<ChatAssociation>> {
        let db = self.conn();
        let mut stmt =
            db.prepare("SELECT master_uid, slave_uid, created_at FROM chat_assoc ORDER BY id")?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (master, slave, created_at) = row?;
            out.push(ChatAssociation {
                master: parse_key(&master)?,
                slave: parse_key(&slave)?,
                created_at: parse_time(&created_at)?,
            });
        }
        Ok(out)
    }

    /// Record a delivery.
    ///
    /// With `entry.update` set, the most recent row for the same master chat
    /// takes the new text, timestamp and flag (falling back to an insert when
    /// the chat has no rows). Otherwise the row is upserted on
    /// `(master_chat, master_msg_id)`.
    #[instrument(skip(self, entry), fields(chat = %entry.master_chat, msg = %entry.master_msg_id, update = entry.update))]
    pub fn append_message_log(&self, entry: &MessageLogEntry) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let chat = entry.master_chat.to_string();

        if entry.update {
            let latest: Option<i64> = tx
                .query_row(
                    "SELECT rowid FROM msg_log WHERE master_chat = ?1
                     ORDER BY created_at DESC, rowid DESC LIMIT 1",
                    rusqlite::params![chat],
                    |r| r.get(0),
                )
                .optional()?;
            if let Some(rowid) = latest {
                tx.execute(
                    "UPDATE msg_log SET text = ?1, created_at = ?2, updated = 1 WHERE rowid = ?3",
                    rusqlite::params![entry.text, timestamp(entry.created_at), rowid],
                )?;
                tx.commit()?;
                return Ok(());
            }
            debug!("no entry to update, inserting");
        }

        tx.execute(
            "INSERT INTO msg_log (master_chat, master_msg_id, text, msg_type, sent_to,
                 slave_origin_uid, slave_origin_display_name, slave_member_uid,
                 slave_member_display_name, created_at, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(master_chat, master_msg_id) DO UPDATE SET
                 text = excluded.text,
                 msg_type = excluded.msg_type,
                 sent_to = excluded.sent_to,
                 slave_origin_uid = excluded.slave_origin_uid,
                 slave_origin_display_name = excluded.slave_origin_display_name,
                 slave_member_uid = excluded.slave_member_uid,
                 slave_member_display_name = excluded.slave_member_display_name,
                 created_at = excluded.created_at,
                 updated = excluded.updated",
            rusqlite::params![
                chat,
                entry.master_msg_id,
                entry.text,
                entry.msg_type.as_str(),
                entry.sent_to.as_str(),
                entry.slave_origin.to_string(),
                entry.slave_origin_display_name,
                entry.slave_member_uid,
                entry.slave_member_display_name,
                timestamp(entry.created_at),
                entry.update,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Most recently logged message for `master_chat`.
    #[instrument(skip(self), fields(chat = %master_chat))]
    pub fn get_last_message(&self, master_chat: &ChatKey) -> Result<Option<MessageLogEntry>> {
        let db = self.conn();
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM msg_log WHERE master_chat = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT 1"
        );
        db.query_row(&sql, rusqlite::params![master_chat.to_string()], row_to_entry)
            .optional()?
            .transpose()
    }

    #[instrument(skip(self), fields(chat = %master_chat, msg = %master_msg_id))]
    pub fn get_message_log(
        &self,
        master_chat: &ChatKey,
        master_msg_id: &str,
    ) -> Result<Option<MessageLogEntry>> {
        let db = self.conn();
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM msg_log WHERE master_chat = ?1 AND master_msg_id = ?2"
        );
        db.query_row(
            &sql,
            rusqlite::params![master_chat.to_string(), master_msg_id],
            row_to_entry,
        )
        .optional()?
        .transpose()
    }
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_key(s: &str) -> Result<ChatKey> {
    ChatKey::parse(s).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {s}: {e}")))
}

/// Raw columns come out of SQLite first; key and enum parsing happens outside
/// the row callback so it can report [`StoreError::Corrupt`].
fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<MessageLogEntry>> {
    let master_chat: String = row.get(0)?;
    let master_msg_id: String = row.get(1)?;
    let text: String = row.get(2)?;
    let msg_type: String = row.get(3)?;
    let sent_to: String = row.get(4)?;
    let origin: String = row.get(5)?;
    let origin_name: String = row.get(6)?;
    let member_uid: Option<String> = row.get(7)?;
    let member_name: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated: bool = row.get(10)?;

    Ok((|| -> Result<MessageLogEntry> {
        Ok(MessageLogEntry {
            master_chat: parse_key(&master_chat)?,
            master_msg_id,
            text,
            msg_type: msg_type
                .parse::<MessageKind>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            sent_to: SentTo::from_db(&sent_to),
            slave_origin: parse_key(&origin)?,
            slave_origin_display_name: origin_name,
            slave_member_uid: member_uid,
            slave_member_display_name: member_name,
            created_at: parse_time(&created_at)?,
            update: updated,
        })
    })())
}
