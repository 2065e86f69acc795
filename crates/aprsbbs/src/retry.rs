//! Background resend of unacknowledged messages.

use std::time::Duration;

use aprsbbs_tick::{TickConfig, TickScheduler};
use aprsbbs_transport::Connection;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::Outbox;

/// Resolves once `stop` reads `true` or its sender is dropped.
///
/// Only `()` leaves this future, so no borrow of the channel value is
/// held by the `select!` that polls it.
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

/// Scans the tracker every `scan_interval` until `stop` turns `true`.
/// The first scan is jittered by up to one interval.
///
/// A failed write is logged and the loop keeps going; the receive loop
/// is the one that ends the session on a dead transport. Returns the
/// number of messages given up on after their last retry.
pub(crate) async fn run_retry_timer<C: Connection>(
    outbox: Outbox<C>,
    scan_interval: Duration,
    mut stop: watch::Receiver<bool>,
) -> usize {
    let mut scheduler =
        TickScheduler::new(TickConfig::every(scan_interval).with_jitter(scan_interval));
    let mut failed = 0;
    debug!(interval_ms = scan_interval.as_millis() as u64, "retry timer started");

    loop {
        tokio::select! {
            () = stopped(&mut stop) => break,
            info = scheduler.wait_for_tick() => {
                match outbox.resend_due().await {
                    Ok(due) if !due.resend.is_empty() || !due.abandoned.is_empty() => {
                        failed += due.abandoned.len();
                        debug!(
                            tick = info.tick,
                            resent = due.resend.len(),
                            abandoned = due.abandoned.len(),
                            "retry scan"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "retry scan failed"),
                }
            }
        }
    }

    debug!(failed, "retry timer stopped");
    failed
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aprsbbs_protocol::{Identity, MessageNo};
    use aprsbbs_session::{AckConfig, AckTracker};
    use aprsbbs_transport::MemoryConnection;
    use tokio::sync::Mutex;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_retry_timer_resends_then_gives_up() {
        let (conn, mut peer) = MemoryConnection::pair();
        let tracker = AckTracker::new(Identity::new("N0CALL").unwrap(), AckConfig::default());
        let outbox = Outbox::new(Arc::new(conn), Arc::new(Mutex::new(tracker)));
        let (stop_tx, stop_rx) = watch::channel(false);

        let to = Identity::new("IZ1ABC").unwrap();
        outbox.send_tracked(&to, "hello").await.unwrap();
        let original = peer.next_line().await.unwrap();

        let task = tokio::spawn(run_retry_timer(
            outbox.clone(),
            Duration::from_secs(5),
            stop_rx,
        ));

        // Two resends, 30s apart, then the entry is abandoned.
        assert_eq!(peer.next_line().await.unwrap(), original);
        assert_eq!(peer.next_line().await.unwrap(), original);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(outbox.pending_len().await, 0);
        assert!(peer.drain().is_empty());

        stop_tx.send_replace(true);
        assert_eq!(task.await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_timer_quiet_after_ack() {
        let (conn, mut peer) = MemoryConnection::pair();
        let tracker = AckTracker::new(Identity::new("N0CALL").unwrap(), AckConfig::default());
        let outbox = Outbox::new(Arc::new(conn), Arc::new(Mutex::new(tracker)));
        let (stop_tx, stop_rx) = watch::channel(false);

        let to = Identity::new("IZ1ABC").unwrap();
        outbox.send_tracked(&to, "hello").await.unwrap();
        peer.next_line().await.unwrap();
        assert!(outbox.acknowledge(&to, &MessageNo::new("00").unwrap()).await);

        let task = tokio::spawn(run_retry_timer(
            outbox.clone(),
            Duration::from_secs(5),
            stop_rx,
        ));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(peer.drain().is_empty());

        stop_tx.send_replace(true);
        assert_eq!(task.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retry_timer_ends_when_stop_sender_dropped() {
        let (conn, _peer) = MemoryConnection::pair();
        let tracker = AckTracker::new(Identity::new("N0CALL").unwrap(), AckConfig::default());
        let outbox = Outbox::new(Arc::new(conn), Arc::new(Mutex::new(tracker)));
        let (stop_tx, stop_rx) = watch::channel(false);

        // Spawning needs the timer future to be Send.
        let task = tokio::spawn(run_retry_timer(outbox, Duration::from_secs(5), stop_rx));
        drop(stop_tx);
        assert_eq!(task.await.unwrap(), 0);
    }
}
