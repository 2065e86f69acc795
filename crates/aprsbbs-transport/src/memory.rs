//! In-process transport backed by Tokio channels.
//!
//! [`MemoryConnection::pair`] returns the engine side and a
//! [`MemoryPeer`] that plays the server: it pushes inbound lines and
//! observes everything the engine wrote. Integration tests drive whole
//! sessions this way without opening sockets.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(1);

/// The engine side of an in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<String>>,
    outbound: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
}

/// The server side of an in-memory connection.
pub struct MemoryPeer {
    to_conn: Option<mpsc::UnboundedSender<String>>,
    from_conn: mpsc::UnboundedReceiver<String>,
}

impl MemoryConnection {
    /// Creates a connected pair.
    pub fn pair() -> (Self, MemoryPeer) {
        let (to_conn, inbound) = mpsc::unbounded_channel();
        let (outbound, from_conn) = mpsc::unbounded_channel();
        let id = ConnectionId::new(NEXT_MEMORY_ID.fetch_add(1, Ordering::Relaxed));
        let conn = Self {
            id,
            inbound: Mutex::new(inbound),
            outbound,
            closed: AtomicBool::new(false),
        };
        let peer = MemoryPeer {
            to_conn: Some(to_conn),
            from_conn,
        };
        (conn, peer)
    }

    /// Whether [`Connection::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Connection for MemoryConnection {
    async fn send_line(&self, line: &str) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed("closed locally".into()));
        }
        self.outbound.send(line.to_string()).map_err(|_| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "peer dropped",
            ))
        })
    }

    async fn recv_line(&self) -> Result<Option<String>, TransportError> {
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl MemoryPeer {
    /// Delivers one line to the engine. Ignored after [`hang_up`](Self::hang_up).
    pub fn push_line(&self, line: impl Into<String>) {
        if let Some(tx) = &self.to_conn {
            let _ = tx.send(line.into());
        }
    }

    /// Closes the inbound direction; the engine's next read returns EOF.
    pub fn hang_up(&mut self) {
        self.to_conn = None;
    }

    /// Waits for the next line the engine wrote.
    ///
    /// Returns `None` once the engine side is dropped.
    pub async fn next_line(&mut self) -> Option<String> {
        self.from_conn.recv().await
    }

    /// Returns every line written so far without waiting.
    pub fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.from_conn.try_recv() {
            lines.push(line);
        }
        lines
    }
}
