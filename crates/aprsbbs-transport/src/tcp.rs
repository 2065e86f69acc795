//! TCP transport implementation using `tokio::net`.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, TransportError, decode_line};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// How long [`TcpConnection::connect`] waits for the socket to open.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest line, terminator included, [`TcpConnection::recv_line`]
/// returns. Longer lines are read to their end and dropped.
pub const MAX_LINE_LEN: usize = 1024;

/// A line-oriented TCP connection to an APRS-IS server.
///
/// The socket is split so the receive loop can block on a read while
/// other tasks write. Each half sits behind its own mutex; the write
/// mutex is the write gate shared by every sender.
pub struct TcpConnection {
    id: ConnectionId,
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
}

impl TcpConnection {
    /// Connects to `host:port`, trying every resolved address in turn.
    pub async fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = format!("{host}:{port}");
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(addr.clone()))?
            .map_err(|source| TransportError::ConnectFailed {
                addr: addr.clone(),
                source,
            })?;

        let conn = Self::from_stream(stream);
        tracing::info!(id = %conn.id, %addr, "connected to APRS-IS server");
        Ok(conn)
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            reader: Mutex::new(BufReader::new(read)),
            writer: Mutex::new(write),
        }
    }
}

impl Connection for TcpConnection {
    async fn send_line(&self, line: &str) -> Result<(), TransportError> {
        let mut data = Vec::with_capacity(line.len() + 2);
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(b"\r\n");

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)?;
        tracing::trace!(id = %self.id, %line, "TX");
        Ok(())
    }

    async fn recv_line(&self) -> Result<Option<String>, TransportError> {
        let mut reader = self.reader.lock().await;
        loop {
            let mut raw = Vec::new();
            let read = (&mut *reader)
                .take(MAX_LINE_LEN as u64)
                .read_until(b'\n', &mut raw)
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if read == 0 {
                return Ok(None);
            }
            if raw.last() == Some(&b'\n') || raw.len() < MAX_LINE_LEN {
                return Ok(Some(decode_line(raw)));
            }

            let rest = skip_line(&mut reader)
                .await
                .map_err(TransportError::ReceiveFailed)?;
            tracing::warn!(id = %self.id, len = MAX_LINE_LEN + rest, "overlong line dropped");
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Consumes input up to and including the next `\n`, or to EOF.
/// Returns the number of bytes skipped.
async fn skip_line(reader: &mut BufReader<OwnedReadHalf>) -> io::Result<usize> {
    let mut skipped = 0;
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(skipped);
        }
        match buf.iter().position(|b| *b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(skipped + end + 1);
            }
            None => {
                let len = buf.len();
                reader.consume(len);
                skipped += len;
            }
        }
    }
}
