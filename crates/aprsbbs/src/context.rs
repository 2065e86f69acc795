use std::sync::Arc;

use aprsbbs_groups::GroupRegistry;
use aprsbbs_mailbox::Mailbox;
use aprsbbs_protocol::{FrameCodec, Identity};
use aprsbbs_session::DuplicateFilter;
use aprsbbs_transport::Connection;
use tokio::sync::Mutex;

use crate::Outbox;

/// Everything the receive loop and the command interpreter touch during
/// one logged-in session.
///
/// `mailbox` and `groups` outlive the session; the outbox (and the
/// tracker behind it) and the duplicate filter are fresh per session.
pub(crate) struct SessionContext<C: Connection> {
    pub(crate) identity: Identity,
    pub(crate) codec: FrameCodec,
    pub(crate) outbox: Outbox<C>,
    pub(crate) mailbox: Arc<Mutex<Mailbox>>,
    pub(crate) groups: Arc<Mutex<GroupRegistry>>,
    pub(crate) duplicates: Mutex<DuplicateFilter>,
}
