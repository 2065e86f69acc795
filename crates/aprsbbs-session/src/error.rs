//! Error types for the session layer.

use aprsbbs_protocol::ProtocolError;

use crate::SessionState;

/// Errors that can occur while driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session was asked to move to a state it cannot reach from
    /// where it is. Always a programming error in the engine.
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },

    /// A tracked message could not be encoded, even after sanitizing.
    #[error("cannot build tracked message: {0}")]
    Unencodable(#[from] ProtocolError),
}
