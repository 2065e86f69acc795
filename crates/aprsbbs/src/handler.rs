//! The receive loop: one line in, one dispatch.
//!
//! The flow per line is:
//!   1. Skip `#` server comments
//!   2. Decode, keeping only frames addressed to the BBS
//!   3. Message → ack it if numbered, drop retries, run the command
//!   4. Ack → clear the tracker entry

use aprsbbs_protocol::{AckFrame, Frame, MessageFrame, is_server_comment};
use aprsbbs_transport::Connection;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::context::SessionContext;
use crate::interpreter;
use crate::retry::stopped;
use crate::{BbsError, SessionEnd};

/// Reads lines until the server hangs up, the transport fails or
/// `shutdown` turns `true`. Counts every line read into `lines`.
pub(crate) async fn receive_loop<C: Connection>(
    ctx: &SessionContext<C>,
    mut shutdown: watch::Receiver<bool>,
    lines: &mut u64,
) -> SessionEnd {
    let conn = ctx.outbox.connection();
    loop {
        let received = tokio::select! {
            () = stopped(&mut shutdown) => {
                info!("shutdown requested");
                return SessionEnd::Shutdown;
            }
            received = conn.recv_line() => received,
        };

        let line = match received {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("server closed the connection");
                return SessionEnd::ServerClosed;
            }
            Err(e) => {
                warn!(error = %e, "receive failed");
                return SessionEnd::TransportFailed;
            }
        };
        *lines += 1;

        if let Err(e) = dispatch_line(ctx, &line).await {
            if e.is_fatal() {
                warn!(error = %e, "send failed, ending session");
                return SessionEnd::TransportFailed;
            }
            warn!(error = %e, "line handling failed");
        }
    }
}

/// Handles one raw line. Only transport failures are returned as
/// errors; bad input is logged and dropped.
pub(crate) async fn dispatch_line<C: Connection>(
    ctx: &SessionContext<C>,
    line: &str,
) -> Result<(), BbsError> {
    if is_server_comment(line) {
        debug!(line, "server comment");
        return Ok(());
    }

    let frame = match ctx.codec.decode(line) {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            trace!(line, "not addressed to us");
            return Ok(());
        }
        Err(e) => {
            debug!(error = %e, line, "undecodable line dropped");
            return Ok(());
        }
    };

    match frame {
        Frame::Message(message) => handle_message(ctx, message).await,
        Frame::Ack(ack) => {
            let matched = ctx
                .outbox
                .acknowledge(&ack.header.source, &ack.message_no)
                .await;
            debug!(
                from = %ack.header.source,
                message_no = %ack.message_no,
                rejected = ack.rejected,
                matched,
                "ack received"
            );
            Ok(())
        }
        other @ (Frame::Object(_) | Frame::Login(_)) => {
            debug!(kind = %other.kind(), "frame ignored");
            Ok(())
        }
    }
}

async fn handle_message<C: Connection>(
    ctx: &SessionContext<C>,
    message: MessageFrame,
) -> Result<(), BbsError> {
    let sender = message.header.source;
    if sender == ctx.identity {
        debug!("own message echoed back, ignored");
        return Ok(());
    }

    if let Some(no) = &message.message_no {
        let ack = AckFrame::new(ctx.identity.clone(), sender.clone(), no.clone());
        ctx.outbox.send_frame(&ack.into()).await?;

        let now = Instant::now().into_std();
        if ctx.duplicates.lock().await.is_duplicate(&sender, no, now) {
            debug!(%sender, message_no = %no, "retried message re-acked, not executed");
            return Ok(());
        }
    }

    debug!(%sender, text = %message.text, "command received");
    interpreter::execute(ctx, &sender, &message.text).await
}
