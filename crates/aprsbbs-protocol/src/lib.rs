//! # aprsbbs-protocol
//!
//! Frame types and the line codec for the aprsbbs gateway.
//!
//! Everything the gateway says to or hears from APRS-IS is one text line.
//! This crate turns those lines into typed [`Frame`]s and back:
//!
//! ```text
//! "IZ1ABC>APRS,TCPIP*::N0CALL   :help{12"
//!          │ decode
//!          ▼
//! Frame::Message { source: IZ1ABC, addressee: N0CALL, text: "help", no: 12 }
//! ```
//!
//! It also owns the primitives every other crate shares: [`Identity`]
//! (call-signs), [`Sequence`] / [`MessageNo`] (ack numbering) and the
//! APRS-IS [`passcode`].

pub mod codec;
pub mod error;
pub mod frame;
pub mod login;
pub mod object;
pub mod types;

pub use codec::{FrameCodec, decode, encode, is_server_comment};
pub use error::ProtocolError;
pub use frame::{AckFrame, Frame, FrameKind, Header, MessageFrame, ObjectFrame};
pub use login::{LoginLine, default_filter, passcode};
pub use object::{Latitude, Longitude, ObjectName, ObjectReport, ObjectTime, Symbol};
pub use types::{Identity, MessageNo, Sequence};
