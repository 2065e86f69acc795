//! Transport abstraction layer for aprsbbs.
//!
//! Provides the [`Connection`] trait: one long-lived, line-oriented,
//! full-duplex link to an APRS-IS server. The session engine only ever
//! talks to this trait, so the same engine runs over a real TCP socket
//! ([`TcpConnection`]) or an in-process pipe ([`MemoryConnection`]).
//!
//! # Write gate
//!
//! Implementations must make [`Connection::send_line`] atomic per line:
//! the receive loop, the retry timer and the beacon scheduler all write
//! concurrently, and a line from one of them must never be split by a
//! line from another.
//!
//! # Feature Flags
//!
//! - `tcp` (default): TCP transport via `tokio::net`

mod error;
mod memory;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
pub use memory::{MemoryConnection, MemoryPeer};
#[cfg(feature = "tcp")]
pub use tcp::{CONNECT_TIMEOUT, MAX_LINE_LEN, TcpConnection};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single connection that exchanges text lines with the remote peer.
///
/// The futures are declared `Send` so the engine can drive a generic
/// connection from spawned Tokio tasks.
pub trait Connection: Send + Sync + 'static {
    /// Sends one line to the remote peer.
    ///
    /// `line` must not contain a line terminator; the implementation
    /// appends `\r\n`.
    fn send_line(
        &self,
        line: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next line from the remote peer, without its
    /// terminator.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv_line(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the connection. Further sends fail.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Strips a trailing `\n` or `\r\n` and decodes the bytes lossily.
///
/// APRS-IS carries whatever bytes stations put on the air, so invalid
/// UTF-8 must never tear the session down.
pub(crate) fn decode_line(mut raw: Vec<u8>) -> String {
    while matches!(raw.last(), Some(b'\n' | b'\r')) {
        raw.pop();
    }
    String::from_utf8_lossy(&raw).into_owned()
}
