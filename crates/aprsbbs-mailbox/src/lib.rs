//! # aprsbbs-mailbox
//!
//! Store-and-forward queue for private BBS messages.
//!
//! `msg K1XYZ hello` from one station becomes a [`PendingMessage`] for
//! K1XYZ; when K1XYZ sends `login`, the gateway fetches the queue and
//! marks each message delivered as it goes out.
//!
//! ```text
//!  enqueue ──► in-memory queue ──► fetch_undelivered ──► mark_delivered
//!                   │                                          │
//!                   └──────── SQLite (write-through) ◄─────────┘
//! ```
//!
//! SQLite is written through on every change and read once, at open, to
//! rebuild the queues after a restart. A failed write is logged at `warn`
//! and never surfaces to the caller.

mod error;
mod mailbox;
mod message;
mod store;

pub use error::MailboxError;
pub use mailbox::Mailbox;
pub use message::{MessageId, PendingMessage};
pub use store::{MessageStore, SqliteStore};
