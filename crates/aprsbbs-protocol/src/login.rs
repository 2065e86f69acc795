//! The login line sent once per session, and the passcode it carries.

use crate::{Identity, ProtocolError};

/// Seed of the APRS-IS passcode hash.
const PASSCODE_SEED: u16 = 0x73E2;

/// Computes the APRS-IS passcode for a call-sign.
///
/// Any `-SSID` suffix is ignored and the call is upper-cased first, so
/// `n0call-10` and `N0CALL` give the same value.
pub fn passcode(callsign: &str) -> i32 {
    let base = callsign
        .split('-')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    let mut hash = PASSCODE_SEED;
    for pair in base.as_bytes().chunks(2) {
        hash ^= u16::from(pair[0]) << 8;
        if let Some(&low) = pair.get(1) {
            hash ^= u16::from(low);
        }
    }
    i32::from(hash & 0x7FFF)
}

/// `user CALL pass N vers SOFTWARE VERSION[ filter EXPR]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginLine {
    pub identity: Identity,
    /// `-1` logs in receive-only.
    pub passcode: i32,
    pub software: String,
    pub version: String,
    pub filter: Option<String>,
}

impl LoginLine {
    /// Builds a login with the computed passcode and the default
    /// `m/CALL` filter.
    pub fn new(identity: Identity, software: impl Into<String>, version: impl Into<String>) -> Self {
        let filter = Some(default_filter(&identity));
        Self {
            passcode: passcode(identity.as_str()),
            identity,
            software: software.into(),
            version: version.into(),
            filter,
        }
    }

    pub(crate) fn encode(&self) -> Result<String, ProtocolError> {
        for (what, token) in [("software", &self.software), ("version", &self.version)] {
            if token.is_empty() || token.contains(char::is_whitespace) {
                return Err(ProtocolError::Unencodable(format!(
                    "{what} must be one word, got {token:?}"
                )));
            }
        }
        let mut line = format!(
            "user {} pass {} vers {} {}",
            self.identity, self.passcode, self.software, self.version
        );
        if let Some(filter) = &self.filter {
            if filter.trim().is_empty() || filter.contains(['\r', '\n']) {
                return Err(ProtocolError::Unencodable(format!(
                    "invalid filter {filter:?}"
                )));
            }
            line.push_str(" filter ");
            line.push_str(filter);
        }
        Ok(line)
    }

    pub(crate) fn decode(line: &str) -> Result<Self, ProtocolError> {
        let malformed = || ProtocolError::MalformedFrame(format!("bad login line {line:?}"));
        let mut tokens = line.splitn(8, ' ');
        if tokens.next() != Some("user") {
            return Err(malformed());
        }
        let identity = Identity::new(tokens.next().ok_or_else(malformed)?)
            .map_err(|_| malformed())?;
        if tokens.next() != Some("pass") {
            return Err(malformed());
        }
        let passcode = tokens
            .next()
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or_else(malformed)?;
        if tokens.next() != Some("vers") {
            return Err(malformed());
        }
        let software = tokens.next().ok_or_else(malformed)?.to_string();
        let version = tokens.next().ok_or_else(malformed)?.to_string();
        let filter = match tokens.next() {
            None => None,
            Some(rest) => Some(
                rest.strip_prefix("filter ")
                    .filter(|expr| !expr.trim().is_empty())
                    .ok_or_else(malformed)?
                    .to_string(),
            ),
        };
        Ok(Self {
            identity,
            passcode,
            software,
            version,
            filter,
        })
    }
}

/// Server-side filter that delivers messages addressed to `identity`.
pub fn default_filter(identity: &Identity) -> String {
    format!("m/{identity}")
}
