//! Executes BBS commands against the mailbox and the group registry.
//!
//! Every reply goes out through the outbox as a tracked message. Bad
//! input is answered, never propagated; only transport failures come
//! back as errors.

use std::sync::Arc;

use aprsbbs_groups::{GroupError, GroupName};
use aprsbbs_mailbox::Mailbox;
use aprsbbs_protocol::Identity;
use aprsbbs_session::split_text;
use aprsbbs_transport::Connection;
use tracing::{debug, info};

use crate::command::{Command, CommandError, GroupCommand, HELP_TEXT};
use crate::context::SessionContext;
use crate::BbsError;

const NO_NEW_MESSAGES: &str = "No new messages.";

/// Runs one inbound message body from `sender`.
pub(crate) async fn execute<C: Connection>(
    ctx: &SessionContext<C>,
    sender: &Identity,
    body: &str,
) -> Result<(), BbsError> {
    let command = match Command::parse(body) {
        Ok(command) => command,
        Err(CommandError::Empty) => {
            debug!(%sender, "empty message body ignored");
            return Ok(());
        }
        Err(e) => {
            debug!(%sender, error = %e, "command rejected");
            return reply(ctx, sender, &e.to_string()).await;
        }
    };
    debug!(%sender, ?command, "executing command");

    match command {
        Command::Login => deliver_mailbox(ctx, sender).await,
        Command::Help => reply(ctx, sender, HELP_TEXT).await,
        Command::Msg { recipient, text } => {
            let (to, from) = (recipient.clone(), sender.clone());
            let id = with_mailbox(ctx, move |mailbox| mailbox.enqueue(&to, &from, &text)).await?;
            info!(%sender, %recipient, %id, "message stored");
            reply(ctx, sender, &format!("Stored message for {recipient}.")).await
        }
        Command::Group(group) => execute_group(ctx, sender, group).await,
    }
}

/// Runs `op` on the blocking pool, where a durable mailbox's SQLite
/// writes may block.
async fn with_mailbox<C, T, F>(ctx: &SessionContext<C>, op: F) -> Result<T, BbsError>
where
    C: Connection,
    T: Send + 'static,
    F: FnOnce(&mut Mailbox) -> T + Send + 'static,
{
    let mailbox = Arc::clone(&ctx.mailbox);
    let result = tokio::task::spawn_blocking(move || op(&mut *mailbox.blocking_lock())).await?;
    Ok(result)
}

async fn reply<C: Connection>(
    ctx: &SessionContext<C>,
    to: &Identity,
    text: &str,
) -> Result<(), BbsError> {
    ctx.outbox.send_tracked(to, text).await.map(|_| ())
}

/// Sends the sender's queued messages, oldest first.
///
/// A body too long for one frame goes out as several, in order. The
/// message is marked delivered once its last frame is written; an ack
/// is not waited for.
async fn deliver_mailbox<C: Connection>(
    ctx: &SessionContext<C>,
    sender: &Identity,
) -> Result<(), BbsError> {
    let pending = ctx.mailbox.lock().await.fetch_undelivered(sender);
    if pending.is_empty() {
        return reply(ctx, sender, NO_NEW_MESSAGES).await;
    }

    info!(%sender, count = pending.len(), "delivering mailbox");
    for message in pending {
        let prefix = format!("From {}: ", message.sender);
        for text in split_text(&prefix, &message.body) {
            ctx.outbox.send_tracked(sender, &text).await?;
        }
        let id = message.id;
        with_mailbox(ctx, move |mailbox| mailbox.mark_delivered(id)).await?;
    }
    Ok(())
}

async fn execute_group<C: Connection>(
    ctx: &SessionContext<C>,
    sender: &Identity,
    command: GroupCommand,
) -> Result<(), BbsError> {
    let outcome: Result<String, GroupError> = match command {
        GroupCommand::Create(name) => ctx
            .groups
            .lock()
            .await
            .create(&name, sender)
            .map(|()| format!("Group '{name}' created and you have joined.")),
        GroupCommand::Join(name) => ctx
            .groups
            .lock()
            .await
            .join(&name, sender)
            .map(|()| format!("Joined group '{name}'.")),
        GroupCommand::Leave(name) => ctx
            .groups
            .lock()
            .await
            .leave(&name, sender)
            .map(|()| format!("Left group '{name}'.")),
        GroupCommand::Msg { name, text } => {
            let members = ctx.groups.lock().await.members(&name);
            match members {
                Ok(members) => {
                    fan_out(ctx, sender, &name, &text, members).await?;
                    Ok(format!("Sent to group '{name}'."))
                }
                Err(e) => Err(e),
            }
        }
    };

    match outcome {
        Ok(text) => reply(ctx, sender, &text).await,
        Err(e) => {
            debug!(%sender, error = %e, "group command refused");
            reply(ctx, sender, &e.to_string()).await
        }
    }
}

/// One tracked copy per member, the sender excluded, split across
/// frames like mailbox delivery.
async fn fan_out<C: Connection>(
    ctx: &SessionContext<C>,
    sender: &Identity,
    name: &GroupName,
    text: &str,
    members: Vec<Identity>,
) -> Result<(), BbsError> {
    let texts = split_text(&format!("[{name}] {sender}: "), text);
    let mut sent = 0usize;
    for member in members.iter().filter(|m| *m != sender) {
        for line in &texts {
            ctx.outbox.send_tracked(member, line).await?;
        }
        sent += 1;
    }
    info!(group = %name, %sender, recipients = sent, "group message sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aprsbbs_groups::GroupRegistry;
    use aprsbbs_mailbox::Mailbox;
    use aprsbbs_protocol::FrameCodec;
    use aprsbbs_session::{AckConfig, AckTracker, DuplicateFilter};
    use aprsbbs_transport::{MemoryConnection, MemoryPeer};
    use tokio::sync::Mutex;

    use super::*;
    use crate::Outbox;

    fn id(call: &str) -> Identity {
        Identity::new(call).unwrap()
    }

    fn context() -> (SessionContext<MemoryConnection>, MemoryPeer) {
        let (conn, peer) = MemoryConnection::pair();
        let bbs = id("N0CALL");
        let tracker = AckTracker::new(bbs.clone(), AckConfig::default());
        let ctx = SessionContext {
            identity: bbs.clone(),
            codec: FrameCodec::new(bbs),
            outbox: Outbox::new(Arc::new(conn), Arc::new(Mutex::new(tracker))),
            mailbox: Arc::new(Mutex::new(Mailbox::in_memory())),
            groups: Arc::new(Mutex::new(GroupRegistry::new())),
            duplicates: Mutex::new(DuplicateFilter::default()),
        };
        (ctx, peer)
    }

    /// Text of every message line written so far, as `(addressee, text)`.
    fn sent(peer: &mut MemoryPeer) -> Vec<(String, String)> {
        peer.drain()
            .into_iter()
            .map(|line| {
                let (_, payload) = line.split_once("::").unwrap();
                let (addressee, rest) = payload.split_once(':').unwrap();
                let text = rest.rsplit_once('{').map_or(rest, |(t, _)| t);
                (addressee.trim_end().to_string(), text.to_string())
            })
            .collect()
    }

    // =====================================================================
    // login / msg
    // =====================================================================

    #[tokio::test]
    async fn test_login_with_empty_mailbox_replies_once() {
        let (ctx, mut peer) = context();
        execute(&ctx, &id("IZ1ABC"), "login").await.unwrap();
        assert_eq!(
            sent(&mut peer),
            vec![("IZ1ABC".into(), "No new messages.".into())]
        );
    }

    #[tokio::test]
    async fn test_msg_then_login_delivers_in_order() {
        let (ctx, mut peer) = context();
        execute(&ctx, &id("K1XYZ"), "msg IZ1ABC first").await.unwrap();
        execute(&ctx, &id("N2QQQ"), "send iz1abc second one").await.unwrap();
        assert_eq!(
            sent(&mut peer),
            vec![
                ("K1XYZ".into(), "Stored message for IZ1ABC.".into()),
                ("N2QQQ".into(), "Stored message for IZ1ABC.".into()),
            ]
        );

        execute(&ctx, &id("IZ1ABC"), "LOGIN").await.unwrap();
        assert_eq!(
            sent(&mut peer),
            vec![
                ("IZ1ABC".into(), "From K1XYZ: first".into()),
                ("IZ1ABC".into(), "From N2QQQ: second one".into()),
            ]
        );
        assert_eq!(ctx.mailbox.lock().await.pending_for(&id("IZ1ABC")), 0);

        // Already delivered: nothing left.
        execute(&ctx, &id("IZ1ABC"), "login").await.unwrap();
        assert_eq!(
            sent(&mut peer),
            vec![("IZ1ABC".into(), "No new messages.".into())]
        );
    }

    #[tokio::test]
    async fn test_long_message_delivered_whole_across_frames() {
        let (ctx, mut peer) = context();
        let body: String = "0123456789 ".repeat(6).chars().take(58).collect();
        execute(&ctx, &id("K1XYZ-10"), &format!("msg IZ1ABC {body}"))
            .await
            .unwrap();
        peer.drain();

        execute(&ctx, &id("IZ1ABC"), "login").await.unwrap();
        let frames = sent(&mut peer);
        assert_eq!(frames.len(), 2);

        let prefix = "From K1XYZ-10: ";
        let mut received = String::new();
        for (to, text) in &frames {
            assert_eq!(to, "IZ1ABC");
            assert!(text.chars().count() <= aprsbbs_session::MAX_TEXT_LEN);
            received.push_str(text.strip_prefix(prefix).unwrap());
        }
        assert_eq!(received, body);
        assert_eq!(ctx.mailbox.lock().await.pending_for(&id("IZ1ABC")), 0);
    }

    #[tokio::test]
    async fn test_login_does_not_see_other_ssid_mail() {
        let (ctx, mut peer) = context();
        execute(&ctx, &id("K1XYZ"), "msg IZ1ABC-7 hi").await.unwrap();
        peer.drain();
        execute(&ctx, &id("IZ1ABC"), "login").await.unwrap();
        assert_eq!(sent(&mut peer)[0].1, "No new messages.");
    }

    #[tokio::test]
    async fn test_help_is_single_reply() {
        let (ctx, mut peer) = context();
        execute(&ctx, &id("IZ1ABC"), "help").await.unwrap();
        assert_eq!(sent(&mut peer), vec![("IZ1ABC".into(), HELP_TEXT.into())]);
    }

    #[tokio::test]
    async fn test_bad_input_gets_reply_text() {
        let (ctx, mut peer) = context();
        execute(&ctx, &id("IZ1ABC"), "dance").await.unwrap();
        execute(&ctx, &id("IZ1ABC"), "msg K1XYZ").await.unwrap();
        let texts: Vec<String> = sent(&mut peer).into_iter().map(|(_, t)| t).collect();
        assert_eq!(
            texts,
            vec!["Unknown command. Try 'help'.", "Usage: msg CALLSIGN message"]
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_ignored() {
        let (ctx, mut peer) = context();
        execute(&ctx, &id("IZ1ABC"), "   ").await.unwrap();
        assert!(peer.drain().is_empty());
    }

    // =====================================================================
    // group
    // =====================================================================

    #[tokio::test]
    async fn test_group_lifecycle_replies() {
        let (ctx, mut peer) = context();
        let a = id("IZ1ABC");
        let b = id("K1XYZ");
        execute(&ctx, &a, "group create ops").await.unwrap();
        execute(&ctx, &a, "group create OPS").await.unwrap();
        execute(&ctx, &b, "group join ops").await.unwrap();
        execute(&ctx, &b, "group join ops").await.unwrap();
        execute(&ctx, &b, "group leave ops").await.unwrap();
        execute(&ctx, &b, "group leave ops").await.unwrap();
        execute(&ctx, &b, "group join nets").await.unwrap();

        let texts: Vec<String> = sent(&mut peer).into_iter().map(|(_, t)| t).collect();
        assert_eq!(
            texts,
            vec![
                "Group 'ops' created and you have joined.",
                "Group 'ops' already exists.",
                "Joined group 'ops'.",
                "You are already a member of 'ops'.",
                "Left group 'ops'.",
                "You are not a member of 'ops'.",
                "Group 'nets' does not exist.",
            ]
        );
    }

    #[tokio::test]
    async fn test_group_msg_reaches_members_except_sender() {
        let (ctx, mut peer) = context();
        execute(&ctx, &id("IZ1ABC"), "group create ops").await.unwrap();
        execute(&ctx, &id("K1XYZ"), "group join ops").await.unwrap();
        execute(&ctx, &id("N2QQQ"), "group join ops").await.unwrap();
        peer.drain();

        execute(&ctx, &id("K1XYZ"), "group msg ops net at 8pm").await.unwrap();
        assert_eq!(
            sent(&mut peer),
            vec![
                ("IZ1ABC".into(), "[ops] K1XYZ: net at 8pm".into()),
                ("N2QQQ".into(), "[ops] K1XYZ: net at 8pm".into()),
                ("K1XYZ".into(), "Sent to group 'ops'.".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_long_group_msg_split_per_member() {
        let (ctx, mut peer) = context();
        execute(&ctx, &id("IZ1ABC"), "group create ops").await.unwrap();
        execute(&ctx, &id("K1XYZ"), "group join ops").await.unwrap();
        peer.drain();

        let text = "w".repeat(60);
        execute(&ctx, &id("IZ1ABC"), &format!("group msg ops {text}"))
            .await
            .unwrap();
        let frames = sent(&mut peer);
        assert_eq!(frames.len(), 3);
        assert!(frames[..2].iter().all(|(to, _)| to == "K1XYZ"));
        let received: String = frames[..2]
            .iter()
            .map(|(_, t)| t.strip_prefix("[ops] IZ1ABC: ").unwrap())
            .collect();
        assert_eq!(received, text);
        assert_eq!(frames[2], ("IZ1ABC".into(), "Sent to group 'ops'.".into()));
    }

    #[tokio::test]
    async fn test_group_msg_unknown_group() {
        let (ctx, mut peer) = context();
        execute(&ctx, &id("IZ1ABC"), "group msg ghosts boo").await.unwrap();
        assert_eq!(
            sent(&mut peer),
            vec![("IZ1ABC".into(), "Group 'ghosts' does not exist.".into())]
        );
    }
}
