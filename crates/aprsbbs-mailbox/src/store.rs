//! Durable message storage.
//!
//! The mailbox talks to its database through [`MessageStore`], so tests
//! can swap in a store that fails on demand. [`SqliteStore`] is the one
//! the gateway uses.

use std::path::Path;

use aprsbbs_protocol::Identity;
use chrono::DateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{MailboxError, MessageId, PendingMessage};

/// Persistence backend behind a [`Mailbox`](crate::Mailbox).
///
/// Ids are assigned by the mailbox, never by the store.
pub trait MessageStore: Send + 'static {
    fn insert(&mut self, message: &PendingMessage) -> Result<(), MailboxError>;

    /// Sets `delivered` on one row. Returns `false` if the row was
    /// missing or already delivered.
    fn mark_delivered(&mut self, id: MessageId) -> Result<bool, MailboxError>;

    /// Every undelivered row, oldest first.
    fn undelivered(&self) -> Result<Vec<PendingMessage>, MailboxError>;

    /// Highest id ever stored, delivered rows included.
    fn max_id(&self) -> Result<Option<MessageId>, MailboxError>;
}

/// SQLite-backed [`MessageStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MailboxError> {
        let path = path.as_ref();
        let open_err = |source| MailboxError::Open {
            path: path.to_path_buf(),
            source,
        };
        let conn = Connection::open(path).map_err(open_err)?;
        let store = Self { conn };
        store.init_schema().map_err(open_err)?;
        Ok(store)
    }

    /// A throwaway database that lives as long as the store.
    pub fn in_memory() -> Result<Self, MailboxError> {
        let open_err = |source| MailboxError::Open {
            path: ":memory:".into(),
            source,
        };
        let conn = Connection::open_in_memory().map_err(open_err)?;
        let store = Self { conn };
        store.init_schema().map_err(open_err)?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient TEXT NOT NULL,
                sender TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                delivered INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_messages_recipient_delivered
                ON messages(recipient, delivered);
            "#,
        )
    }

    /// Loads one row by id, delivered or not.
    pub fn get(&self, id: MessageId) -> Result<Option<PendingMessage>, MailboxError> {
        self.conn
            .query_row(
                "SELECT id, recipient, sender, body, created_at, delivered
                 FROM messages WHERE id = ?1",
                params![id.0 as i64],
                row_to_message,
            )
            .optional()
            .map_err(MailboxError::Read)
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<PendingMessage> {
    let identity = |idx: usize| -> rusqlite::Result<Identity> {
        let raw: String = row.get(idx)?;
        Identity::new(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    };
    let created_ms: i64 = row.get(4)?;
    Ok(PendingMessage {
        id: MessageId(row.get::<_, i64>(0)? as u64),
        recipient: identity(1)?,
        sender: identity(2)?,
        body: row.get(3)?,
        created_at: DateTime::from_timestamp_millis(created_ms).unwrap_or_default(),
        delivered: row.get::<_, i64>(5)? != 0,
    })
}

impl MessageStore for SqliteStore {
    fn insert(&mut self, message: &PendingMessage) -> Result<(), MailboxError> {
        self.conn
            .execute(
                "INSERT INTO messages (id, recipient, sender, body, created_at, delivered)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id.0 as i64,
                    message.recipient.as_str(),
                    message.sender.as_str(),
                    message.body,
                    message.created_at.timestamp_millis(),
                    message.delivered as i64,
                ],
            )
            .map_err(MailboxError::DurableWrite)?;
        Ok(())
    }

    fn mark_delivered(&mut self, id: MessageId) -> Result<bool, MailboxError> {
        let changed = self
            .conn
            .execute(
                "UPDATE messages SET delivered = 1 WHERE id = ?1 AND delivered = 0",
                params![id.0 as i64],
            )
            .map_err(MailboxError::DurableWrite)?;
        Ok(changed > 0)
    }

    fn undelivered(&self) -> Result<Vec<PendingMessage>, MailboxError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, recipient, sender, body, created_at, delivered
                 FROM messages WHERE delivered = 0 ORDER BY id",
            )
            .map_err(MailboxError::Read)?;
        let rows = stmt
            .query_map([], row_to_message)
            .map_err(MailboxError::Read)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row.map_err(MailboxError::Read)?);
        }
        Ok(messages)
    }

    fn max_id(&self) -> Result<Option<MessageId>, MailboxError> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(id) FROM messages", [], |row| row.get(0))
            .map_err(MailboxError::Read)?;
        Ok(max.map(|id| MessageId(id as u64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(id: u64, recipient: &str) -> PendingMessage {
        PendingMessage {
            id: MessageId(id),
            recipient: Identity::new(recipient).unwrap(),
            sender: Identity::new("IZ1ABC").unwrap(),
            body: format!("body {id}"),
            created_at: DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap(),
            delivered: false,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = SqliteStore::in_memory().unwrap();
        let msg = message(1, "K1XYZ");
        store.insert(&msg).unwrap();
        assert_eq!(store.get(MessageId(1)).unwrap(), Some(msg));
        assert_eq!(store.get(MessageId(2)).unwrap(), None);
    }

    #[test]
    fn test_max_id_empty_then_highest() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.max_id().unwrap(), None);
        store.insert(&message(3, "K1XYZ")).unwrap();
        store.insert(&message(7, "K1XYZ")).unwrap();
        assert_eq!(store.max_id().unwrap(), Some(MessageId(7)));
    }

    #[test]
    fn test_mark_delivered_once() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.insert(&message(1, "K1XYZ")).unwrap();
        assert!(store.mark_delivered(MessageId(1)).unwrap());
        assert!(!store.mark_delivered(MessageId(1)).unwrap());
        assert!(!store.mark_delivered(MessageId(99)).unwrap());

        // Delivered rows are retained.
        let row = store.get(MessageId(1)).unwrap().unwrap();
        assert!(row.delivered);
    }

    #[test]
    fn test_undelivered_excludes_delivered_and_orders_by_id() {
        let mut store = SqliteStore::in_memory().unwrap();
        for (id, to) in [(1, "K1XYZ"), (2, "N2QQQ"), (3, "K1XYZ")] {
            store.insert(&message(id, to)).unwrap();
        }
        store.mark_delivered(MessageId(2)).unwrap();

        let ids: Vec<_> = store.undelivered().unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MessageId(1), MessageId(3)]);
    }

    #[test]
    fn test_duplicate_id_is_durable_write_error() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.insert(&message(1, "K1XYZ")).unwrap();
        let err = store.insert(&message(1, "K1XYZ")).unwrap_err();
        assert!(matches!(err, MailboxError::DurableWrite(_)));
    }

    #[test]
    fn test_open_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("deeper").join("bbs.db");
        let err = SqliteStore::open(&path).err().unwrap();
        assert!(matches!(err, MailboxError::Open { .. }));
    }
}
