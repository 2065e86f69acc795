//! The closed set of frames the gateway reads and writes.
//!
//! A [`Frame`] is produced once by the codec and consumed by exhaustive
//! matching in the session engine:
//!
//! ```text
//! Frame
//!  ├── Login    user CALL pass N vers SW VER filter EXPR
//!  ├── Message  SRC>APRS,TCPIP*::ADDRESSEE:text{NO
//!  ├── Ack      SRC>APRS,TCPIP*::ADDRESSEE:ackNO   (or rejNO)
//!  └── Object   SRC>APRS,TCPIP*:;NAME     *HHMMSSz...
//! ```

use crate::object::ObjectReport;
use crate::{Identity, LoginLine, MessageNo};

/// Destination used for everything this gateway originates.
pub const DEFAULT_TOCALL: &str = "APRS";

/// Path used for everything this gateway originates.
pub const DEFAULT_PATH: &str = "TCPIP*";

/// The `SOURCE>TOCALL,PATH...` prefix of a data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub source: Identity,
    pub tocall: String,
    pub path: Vec<String>,
}

impl Header {
    /// Header for a frame originated by `source`: `SOURCE>APRS,TCPIP*`.
    pub fn new(source: Identity) -> Self {
        Self {
            source,
            tocall: DEFAULT_TOCALL.to_string(),
            path: vec![DEFAULT_PATH.to_string()],
        }
    }
}

/// Discriminant of a [`Frame`], used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Login,
    Message,
    Ack,
    Object,
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FrameKind::Login => "login",
            FrameKind::Message => "message",
            FrameKind::Ack => "ack",
            FrameKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// A text message, optionally asking for an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFrame {
    pub header: Header,
    pub addressee: Identity,
    pub text: String,
    /// Present when the sender wants an `ack` back.
    pub message_no: Option<MessageNo>,
}

impl MessageFrame {
    pub fn new(
        source: Identity,
        addressee: Identity,
        text: impl Into<String>,
        message_no: Option<MessageNo>,
    ) -> Self {
        Self {
            header: Header::new(source),
            addressee,
            text: text.into(),
            message_no,
        }
    }
}

/// An acknowledgement (or rejection) of a numbered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckFrame {
    pub header: Header,
    /// The station whose message is being acknowledged.
    pub addressee: Identity,
    pub message_no: MessageNo,
    pub rejected: bool,
}

impl AckFrame {
    pub fn new(source: Identity, addressee: Identity, message_no: MessageNo) -> Self {
        Self {
            header: Header::new(source),
            addressee,
            message_no,
            rejected: false,
        }
    }
}

/// An object report.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectFrame {
    pub header: Header,
    pub object: ObjectReport,
}

impl ObjectFrame {
    pub fn new(source: Identity, object: ObjectReport) -> Self {
        Self {
            header: Header::new(source),
            object,
        }
    }
}

/// One protocol line, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Login(LoginLine),
    Message(MessageFrame),
    Ack(AckFrame),
    Object(ObjectFrame),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Login(_) => FrameKind::Login,
            Frame::Message(_) => FrameKind::Message,
            Frame::Ack(_) => FrameKind::Ack,
            Frame::Object(_) => FrameKind::Object,
        }
    }

    /// The originating station. For a login line, the station logging in.
    pub fn source(&self) -> &Identity {
        match self {
            Frame::Login(login) => &login.identity,
            Frame::Message(m) => &m.header.source,
            Frame::Ack(a) => &a.header.source,
            Frame::Object(o) => &o.header.source,
        }
    }

    /// The addressed station, for frames that have one.
    pub fn destination(&self) -> Option<&Identity> {
        match self {
            Frame::Message(m) => Some(&m.addressee),
            Frame::Ack(a) => Some(&a.addressee),
            Frame::Login(_) | Frame::Object(_) => None,
        }
    }
}

impl From<MessageFrame> for Frame {
    fn from(frame: MessageFrame) -> Self {
        Frame::Message(frame)
    }
}

impl From<AckFrame> for Frame {
    fn from(frame: AckFrame) -> Self {
        Frame::Ack(frame)
    }
}

impl From<ObjectFrame> for Frame {
    fn from(frame: ObjectFrame) -> Self {
        Frame::Object(frame)
    }
}

impl From<LoginLine> for Frame {
    fn from(login: LoginLine) -> Self {
        Frame::Login(login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(call: &str) -> Identity {
        Identity::new(call).unwrap()
    }

    #[test]
    fn test_header_new_uses_default_route() {
        let header = Header::new(id("N0CALL"));
        assert_eq!(header.tocall, "APRS");
        assert_eq!(header.path, vec!["TCPIP*".to_string()]);
    }

    #[test]
    fn test_frame_accessors_for_message() {
        let frame: Frame = MessageFrame::new(id("IZ1ABC"), id("N0CALL"), "help", None).into();
        assert_eq!(frame.kind(), FrameKind::Message);
        assert_eq!(frame.source(), &id("IZ1ABC"));
        assert_eq!(frame.destination(), Some(&id("N0CALL")));
    }

    #[test]
    fn test_frame_accessors_for_login() {
        let frame: Frame = LoginLine::new(id("N0CALL"), "APRSBBS", "0.1.0").into();
        assert_eq!(frame.kind(), FrameKind::Login);
        assert_eq!(frame.source(), &id("N0CALL"));
        assert_eq!(frame.destination(), None);
    }

    #[test]
    fn test_frame_kind_display() {
        assert_eq!(FrameKind::Ack.to_string(), "ack");
        assert_eq!(FrameKind::Object.to_string(), "object");
    }
}
