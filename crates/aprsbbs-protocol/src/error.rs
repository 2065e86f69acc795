//! Error types for the protocol layer.
//!
//! Each crate in aprsbbs defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the text of a line, not in the
//! network or in the mailbox.

/// Errors that can occur while decoding or encoding protocol lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A required field is missing or has the wrong layout.
    ///
    /// Inbound frames that fail this way are dropped without a reply.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The payload is well-formed APRS but of a type this gateway does
    /// not handle (position reports, weather, telemetry...).
    #[error("unsupported payload type {0:?}")]
    Unsupported(char),

    /// A call-sign failed validation.
    #[error("invalid identity {0:?}")]
    InvalidIdentity(String),

    /// A message number is not 1–5 ASCII alphanumerics, or a sequence
    /// is out of range.
    #[error("invalid message number {0:?}")]
    InvalidMessageNo(String),

    /// A frame holds content that has no canonical line form.
    #[error("cannot encode frame: {0}")]
    Unencodable(String),
}
