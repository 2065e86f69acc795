//! # aprsbbs
//!
//! A bulletin-board service that lives on the APRS-IS network.
//!
//! The gateway logs in to an APRS-IS server under its own call-sign and
//! answers text messages addressed to it: stations leave private mail
//! for each other, fetch it with `login`, and chat in named groups.
//! Every reply is an acknowledged APRS message, retried until the
//! recipient acks it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aprsbbs::prelude::*;
//!
//! # async fn demo() -> Result<(), BbsError> {
//! let gateway = Gateway::builder(Identity::new("N0CALL-10")?)
//!     .server("rotate.aprs2.net", 14580)
//!     .build()?;
//! let summary = gateway.run().await?;
//! println!("session ended: {:?}", summary.end);
//! # Ok(())
//! # }
//! ```

mod beacon;
mod command;
mod config;
mod context;
mod error;
mod gateway;
mod handler;
mod interpreter;
mod outbox;
mod retry;

pub use beacon::build_beacon;
pub use command::{Command, CommandError, GroupCommand, HELP_TEXT};
pub use config::{BeaconConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SOFTWARE, GatewayConfig};
pub use error::BbsError;
pub use gateway::{Gateway, GatewayBuilder, SessionEnd, SessionSummary, ShutdownHandle};
pub use outbox::Outbox;

pub use aprsbbs_groups as groups;
pub use aprsbbs_mailbox as mailbox;
pub use aprsbbs_protocol as protocol;
pub use aprsbbs_session as session;
pub use aprsbbs_transport as transport;

/// Convenience re-exports for gateway users.
pub mod prelude {
    pub use crate::{
        BbsError, BeaconConfig, Gateway, GatewayBuilder, GatewayConfig, SessionEnd,
        SessionSummary, ShutdownHandle,
    };
    pub use aprsbbs_mailbox::Mailbox;
    pub use aprsbbs_protocol::Identity;
    pub use aprsbbs_session::AckConfig;
    pub use aprsbbs_transport::{Connection, MemoryConnection, TcpConnection};
}
