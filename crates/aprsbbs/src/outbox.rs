//! The single path every outgoing line takes.
//!
//! Tracked sends are numbered by the [`AckTracker`] under its lock; the
//! lock is released before the line reaches the transport.

use std::sync::Arc;

use aprsbbs_protocol::{Frame, Identity, MessageNo, Sequence, encode};
use aprsbbs_session::{AckTracker, DueSends};
use aprsbbs_transport::Connection;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::BbsError;

pub struct Outbox<C: Connection> {
    conn: Arc<C>,
    tracker: Arc<Mutex<AckTracker>>,
}

impl<C: Connection> Clone for Outbox<C> {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<C: Connection> Outbox<C> {
    pub fn new(conn: Arc<C>, tracker: Arc<Mutex<AckTracker>>) -> Self {
        Self { conn, tracker }
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.conn
    }

    /// Sends a message that expects an ack and will be retried.
    ///
    /// The body is sanitized and truncated to fit one frame.
    pub async fn send_tracked(&self, recipient: &Identity, body: &str) -> Result<Sequence, BbsError> {
        let sent = {
            let mut tracker = self.tracker.lock().await;
            tracker.prepare(recipient, body, Instant::now().into_std())?
        };
        self.conn.send_line(&sent.line).await?;
        tracing::debug!(%recipient, sequence = %sent.sequence, "tracked message sent");
        Ok(sent.sequence)
    }

    /// Sends a frame once, with no ack bookkeeping.
    pub async fn send_frame(&self, frame: &Frame) -> Result<(), BbsError> {
        let line = encode(frame)?;
        self.conn.send_line(&line).await?;
        tracing::debug!(kind = %frame.kind(), "untracked frame sent");
        Ok(())
    }

    /// Forwards an inbound ack to the tracker.
    pub async fn acknowledge(&self, from: &Identity, message_no: &MessageNo) -> bool {
        self.tracker.lock().await.acknowledge(from, message_no)
    }

    /// Writes every overdue message again.
    ///
    /// Returns the scan result; `resend` lists the lines written.
    pub async fn resend_due(&self) -> Result<DueSends, BbsError> {
        let due = {
            let mut tracker = self.tracker.lock().await;
            tracker.collect_due(Instant::now().into_std())
        };
        for line in &due.resend {
            self.conn.send_line(line).await?;
        }
        Ok(due)
    }

    /// Drops every unacknowledged send. Returns how many there were.
    pub async fn abandon_all(&self) -> usize {
        self.tracker.lock().await.abandon_all()
    }

    pub async fn pending_len(&self) -> usize {
        self.tracker.lock().await.pending_len()
    }
}
