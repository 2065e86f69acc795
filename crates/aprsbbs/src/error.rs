//! Unified error type for the aprsbbs gateway.

use aprsbbs_groups::GroupError;
use aprsbbs_mailbox::MailboxError;
use aprsbbs_protocol::ProtocolError;
use aprsbbs_session::SessionError;
use aprsbbs_transport::TransportError;

use crate::CommandError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum BbsError {
    /// Connection, send or receive failure. Ends the session.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Opening the message store failed.
    #[error(transparent)]
    Mailbox(#[from] MailboxError),

    #[error(transparent)]
    Group(#[from] GroupError),

    #[error(transparent)]
    Command(#[from] CommandError),

    /// A mailbox operation on the blocking pool panicked or was
    /// cancelled.
    #[error("mailbox task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The gateway was built with settings it cannot run with.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BbsError {
    /// Whether this error means the connection is gone.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BbsError::Transport(_))
    }
}
