//! The mailbox: per-recipient queues of private messages.

use std::collections::HashMap;
use std::path::Path;

use aprsbbs_protocol::Identity;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{MailboxError, MessageId, MessageStore, PendingMessage, SqliteStore};

/// Private messages, keyed by recipient.
///
/// The in-memory queues are what callers read. Delivered messages stay
/// in their queue with `delivered` set, so a memory-only mailbox keeps
/// the same record a durable one does. Every change is also written
/// through to the durable store, if there is one; a failed write is
/// logged and otherwise ignored, so the running gateway never loses a
/// message it has accepted.
///
/// Store calls are synchronous. Async callers run them on the blocking
/// pool.
pub struct Mailbox {
    store: Option<Box<dyn MessageStore>>,
    queues: HashMap<Identity, Vec<PendingMessage>>,
    next_id: u64,
}

impl Mailbox {
    /// Opens the SQLite database at `path` and recovers undelivered rows.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MailboxError> {
        Self::with_store(SqliteStore::open(path)?)
    }

    /// A mailbox with no durable backing.
    pub fn in_memory() -> Self {
        Self {
            store: None,
            queues: HashMap::new(),
            next_id: 1,
        }
    }

    /// Wraps an existing store, loading every undelivered row.
    ///
    /// New ids continue after the highest id the store has ever seen.
    /// Rows delivered before the restart stay in the store only.
    pub fn with_store(store: impl MessageStore) -> Result<Self, MailboxError> {
        let next_id = store.max_id()?.map_or(1, |id| id.0 + 1);
        let recovered = store.undelivered()?;

        let mut queues: HashMap<Identity, Vec<PendingMessage>> = HashMap::new();
        let count = recovered.len();
        for message in recovered {
            queues
                .entry(message.recipient.clone())
                .or_default()
                .push(message);
        }

        info!(recovered = count, next_id, "mailbox opened");
        Ok(Self {
            store: Some(Box::new(store)),
            queues,
            next_id,
        })
    }

    /// Queues a message for `recipient`. Always succeeds.
    pub fn enqueue(&mut self, recipient: &Identity, sender: &Identity, body: &str) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;

        let message = PendingMessage {
            id,
            recipient: recipient.clone(),
            sender: sender.clone(),
            body: body.to_string(),
            created_at: Utc::now(),
            delivered: false,
        };

        if let Some(store) = self.store.as_mut() {
            if let Err(error) = store.insert(&message) {
                warn!(%id, %recipient, %error, "mailbox write not persisted, keeping in memory");
            }
        }

        self.queues
            .entry(recipient.clone())
            .or_default()
            .push(message);
        debug!(%id, %recipient, %sender, "message stored");
        id
    }

    /// Undelivered messages for `recipient`, oldest first.
    ///
    /// Does not change anything; callers mark each one as they hand it
    /// off.
    pub fn fetch_undelivered(&self, recipient: &Identity) -> Vec<PendingMessage> {
        self.queues
            .get(recipient)
            .map(|queue| queue.iter().filter(|m| !m.delivered).cloned().collect())
            .unwrap_or_default()
    }

    /// Every message held for `recipient`, delivered or not, oldest first.
    pub fn history(&self, recipient: &Identity) -> Vec<PendingMessage> {
        self.queues.get(recipient).cloned().unwrap_or_default()
    }

    /// Marks one message delivered. Returns `false` if it was unknown or
    /// already delivered.
    pub fn mark_delivered(&mut self, id: MessageId) -> bool {
        let Some(message) = self
            .queues
            .values_mut()
            .flat_map(|queue| queue.iter_mut())
            .find(|m| m.id == id && !m.delivered)
        else {
            return false;
        };
        message.delivered = true;
        let recipient = message.recipient.clone();

        if let Some(store) = self.store.as_mut() {
            if let Err(error) = store.mark_delivered(id) {
                warn!(%id, %recipient, %error, "delivery flag not persisted");
            }
        }
        debug!(%id, %recipient, "message delivered");
        true
    }

    /// Number of undelivered messages for one recipient.
    pub fn pending_for(&self, recipient: &Identity) -> usize {
        self.queues
            .get(recipient)
            .map_or(0, |queue| queue.iter().filter(|m| !m.delivered).count())
    }

    /// Number of undelivered messages overall.
    pub fn pending_total(&self) -> usize {
        self.queues
            .values()
            .flatten()
            .filter(|m| !m.delivered)
            .count()
    }

    /// Whether writes go to a durable store.
    pub fn is_durable(&self) -> bool {
        self.store.is_some()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::in_memory()
    }
}
