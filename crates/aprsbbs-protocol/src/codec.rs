//! Line codec: text lines to [`Frame`]s and back.
//!
//! [`encode`] and [`decode`] are pure functions over single lines (no
//! CR/LF). [`FrameCodec`] wraps them with the gateway's own identity and
//! discards traffic that is not addressed to it.

use crate::frame::{AckFrame, Header, MessageFrame, ObjectFrame};
use crate::object::ObjectReport;
use crate::{Frame, Identity, LoginLine, MessageNo, ProtocolError};

/// Width of the addressee field in message and ack payloads.
pub const ADDRESSEE_WIDTH: usize = 9;

/// Characters that may never appear in message text.
pub const FORBIDDEN_TEXT_CHARS: [char; 5] = ['{', '|', '~', '\r', '\n'];

/// Whether a line is a server comment (`# aprsc ...`, `# logresp ...`).
pub fn is_server_comment(line: &str) -> bool {
    line.starts_with('#')
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serializes a frame to its canonical line.
///
/// Fails with [`ProtocolError::Unencodable`] when the frame's content
/// cannot be written without changing its meaning on the way back in.
pub fn encode(frame: &Frame) -> Result<String, ProtocolError> {
    match frame {
        Frame::Login(login) => login.encode(),
        Frame::Message(m) => {
            if let Some(c) = m.text.chars().find(|c| FORBIDDEN_TEXT_CHARS.contains(c)) {
                return Err(ProtocolError::Unencodable(format!(
                    "message text contains {c:?}"
                )));
            }
            if parse_ack_text(&m.text).is_some() {
                return Err(ProtocolError::Unencodable(format!(
                    "message text {:?} would read back as an ack",
                    m.text
                )));
            }
            let mut line = format!(
                "{}::{:<width$}:{}",
                encode_header(&m.header)?,
                m.addressee,
                m.text,
                width = ADDRESSEE_WIDTH
            );
            if let Some(no) = &m.message_no {
                line.push('{');
                line.push_str(no.as_str());
            }
            Ok(line)
        }
        Frame::Ack(a) => Ok(format!(
            "{}::{:<width$}:{}{}",
            encode_header(&a.header)?,
            a.addressee,
            if a.rejected { "rej" } else { "ack" },
            a.message_no,
            width = ADDRESSEE_WIDTH
        )),
        Frame::Object(o) => Ok(format!(
            "{}:;{}",
            encode_header(&o.header)?,
            o.object.encode()?
        )),
    }
}

fn encode_header(header: &Header) -> Result<String, ProtocolError> {
    let mut out = format!("{}>", header.source);
    for (i, hop) in std::iter::once(&header.tocall)
        .chain(header.path.iter())
        .enumerate()
    {
        if hop.is_empty() || hop.contains([',', ':', '>', ' ', '\r', '\n']) {
            return Err(ProtocolError::Unencodable(format!("invalid route hop {hop:?}")));
        }
        if i > 0 {
            out.push(',');
        }
        out.push_str(hop);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parses one line into a frame.
pub fn decode(line: &str) -> Result<Frame, ProtocolError> {
    if line.starts_with("user ") {
        return LoginLine::decode(line).map(Frame::Login);
    }

    let (head, payload) = line
        .split_once(':')
        .ok_or_else(|| ProtocolError::MalformedFrame("missing payload separator".into()))?;
    let header = decode_header(head)?;

    let mut chars = payload.chars();
    match chars.next() {
        Some(':') => decode_message(header, chars.as_str()),
        Some(';') => Ok(Frame::Object(ObjectFrame {
            header,
            object: ObjectReport::decode(chars.as_str())?,
        })),
        Some(other) => Err(ProtocolError::Unsupported(other)),
        None => Err(ProtocolError::MalformedFrame("empty payload".into())),
    }
}

fn decode_header(head: &str) -> Result<Header, ProtocolError> {
    let (source, route) = head
        .split_once('>')
        .ok_or_else(|| ProtocolError::MalformedFrame("missing '>' after source".into()))?;
    let source = Identity::new(source)?;
    let mut hops = route.split(',');
    let tocall = hops
        .next()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ProtocolError::MalformedFrame("missing destination".into()))?
        .to_string();
    Ok(Header {
        source,
        tocall,
        path: hops.map(str::to_string).collect(),
    })
}

fn decode_message(header: Header, body: &str) -> Result<Frame, ProtocolError> {
    let addressee = body
        .get(..ADDRESSEE_WIDTH)
        .filter(|_| body.get(ADDRESSEE_WIDTH..=ADDRESSEE_WIDTH) == Some(":"))
        .ok_or_else(|| ProtocolError::MalformedFrame("bad addressee block".into()))?;
    let addressee = Identity::new(addressee)?;
    let text = &body[ADDRESSEE_WIDTH + 1..];

    if let Some((rejected, message_no)) = parse_ack_text(text) {
        return Ok(Frame::Ack(AckFrame {
            header,
            addressee,
            message_no,
            rejected,
        }));
    }

    let (text, message_no) = match text.split_once('{') {
        Some((text, no)) => {
            // Reply-ack capable clients send `{MM}AA`; only MM is ours to ack.
            let no = no.split('}').next().unwrap_or_default().trim_end();
            (text, MessageNo::new(no).ok())
        }
        None => (text, None),
    };
    Ok(Frame::Message(MessageFrame {
        header,
        addressee,
        text: text.to_string(),
        message_no,
    }))
}

/// Recognizes `ackNO` / `rejNO` message text.
fn parse_ack_text(text: &str) -> Option<(bool, MessageNo)> {
    let (rejected, rest) = if let Some(rest) = text.strip_prefix("ack") {
        (false, rest)
    } else if let Some(rest) = text.strip_prefix("rej") {
        (true, rest)
    } else {
        return None;
    };
    let no = rest.split('}').next().unwrap_or_default().trim_end();
    MessageNo::new(no).ok().map(|no| (rejected, no))
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// Codec bound to the gateway's identity.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    local: Identity,
}

impl FrameCodec {
    pub fn new(local: Identity) -> Self {
        Self { local }
    }

    /// The identity frames must be addressed to.
    pub fn local(&self) -> &Identity {
        &self.local
    }

    pub fn encode(&self, frame: &Frame) -> Result<String, ProtocolError> {
        encode(frame)
    }

    /// Decodes a line and keeps it only if it is meant for us.
    ///
    /// Messages and acks for other stations, object reports and login
    /// lines all come back as `Ok(None)`.
    pub fn decode(&self, line: &str) -> Result<Option<Frame>, ProtocolError> {
        let frame = decode(line)?;
        let ours = match &frame {
            Frame::Message(m) => m.addressee == self.local,
            Frame::Ack(a) => a.addressee == self.local,
            Frame::Object(_) | Frame::Login(_) => false,
        };
        Ok(ours.then_some(frame))
    }
}
