//! Error types for the mailbox layer.

use std::path::PathBuf;

/// Errors that can occur in the mailbox or its durable store.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    /// The database could not be opened or its schema created.
    ///
    /// Fatal at startup: the gateway refuses to run without its store.
    #[error("failed to open message store at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A write to the durable store failed.
    ///
    /// The mailbox logs this and carries on with its in-memory copy.
    #[error("durable write failed: {0}")]
    DurableWrite(#[source] rusqlite::Error),

    /// Reading rows back (at recovery, or for inspection) failed.
    #[error("message store read failed: {0}")]
    Read(#[source] rusqlite::Error),
}
