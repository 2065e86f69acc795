//! Identity and numbering primitives shared by every layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A station call-sign, optionally followed by `-SSID`.
///
/// Stored upper-cased, so equality is case-insensitive. Two identities
/// are equal only when the full strings match: `N0CALL` and `N0CALL-7`
/// are different stations for mailbox, group and ACK bookkeeping.
///
/// Serializes as the plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Longest call-sign accepted on APRS-IS, suffix included.
    pub const MAX_LEN: usize = 9;

    /// Validates and normalizes a call-sign.
    ///
    /// Accepts 1–9 ASCII letters, digits and `-`; surrounding whitespace
    /// is ignored.
    pub fn new(raw: &str) -> Result<Self, ProtocolError> {
        let call = raw.trim().to_ascii_uppercase();
        let valid = !call.is_empty()
            && call.len() <= Self::MAX_LEN
            && !call.starts_with('-')
            && !call.ends_with('-')
            && call.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(ProtocolError::InvalidIdentity(raw.to_string()));
        }
        Ok(Self(call))
    }

    /// The normalized call-sign.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The call-sign without its suffix (`N0CALL-7` → `N0CALL`).
    pub fn base(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// The station suffix, if any.
    pub fn ssid(&self) -> Option<&str> {
        self.0.split_once('-').map(|(_, ssid)| ssid)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for Identity {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

/// An outgoing ACK sequence number in `0..=99`.
///
/// Allocated round-robin per recipient and always rendered as two
/// zero-padded digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sequence(u8);

impl Sequence {
    /// Number of distinct sequence values before wrapping.
    pub const MODULUS: u8 = 100;

    /// The first sequence handed to a never-seen recipient.
    pub const ZERO: Self = Self(0);

    /// Creates a sequence, rejecting values above 99.
    pub fn new(value: u8) -> Result<Self, ProtocolError> {
        if value >= Self::MODULUS {
            return Err(ProtocolError::InvalidMessageNo(value.to_string()));
        }
        Ok(Self(value))
    }

    /// The numeric value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// The following sequence, wrapping 99 → 0.
    pub fn next(self) -> Self {
        Self((self.0 + 1) % Self::MODULUS)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MessageNo
// ---------------------------------------------------------------------------

/// A message identifier as it appears on the wire after `{` or `ack`.
///
/// Other stations may use any 1–5 alphanumerics. The ones this gateway
/// emits are always two-digit [`Sequence`]s.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageNo(String);

impl MessageNo {
    /// Longest message number allowed by the APRS message format.
    pub const MAX_LEN: usize = 5;

    /// Validates a message number.
    pub fn new(raw: &str) -> Result<Self, ProtocolError> {
        let valid = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(ProtocolError::InvalidMessageNo(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interprets this number as one of our sequences.
    ///
    /// Only exactly two decimal digits qualify, since that is the only
    /// form the tracker ever sends.
    pub fn as_sequence(&self) -> Option<Sequence> {
        let bytes = self.0.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }
        self.0.parse().ok().and_then(|v| Sequence::new(v).ok())
    }
}

impl From<Sequence> for MessageNo {
    fn from(seq: Sequence) -> Self {
        Self(seq.to_string())
    }
}

impl fmt::Display for MessageNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Identity
    // =====================================================================

    #[test]
    fn test_identity_new_normalizes_case_and_whitespace() {
        let id = Identity::new("  n0call-7 ").unwrap();
        assert_eq!(id.as_str(), "N0CALL-7");
        assert_eq!(id, Identity::new("N0CALL-7").unwrap());
    }

    #[test]
    fn test_identity_base_and_ssid() {
        let id = Identity::new("IZ1ABC-10").unwrap();
        assert_eq!(id.base(), "IZ1ABC");
        assert_eq!(id.ssid(), Some("10"));

        let plain = Identity::new("IZ1ABC").unwrap();
        assert_eq!(plain.base(), "IZ1ABC");
        assert_eq!(plain.ssid(), None);
    }

    #[test]
    fn test_identity_suffixed_differs_from_base() {
        let base = Identity::new("N0CALL").unwrap();
        let suffixed = Identity::new("N0CALL-1").unwrap();
        assert_ne!(base, suffixed);
    }

    #[test]
    fn test_identity_rejects_invalid() {
        for raw in ["", "   ", "TOOLONGCALL", "N0 CALL", "-N0CALL", "N0CALL-", "N0CALL*"] {
            assert!(
                matches!(Identity::new(raw), Err(ProtocolError::InvalidIdentity(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_identity_serializes_as_plain_string() {
        let json = serde_json::to_string(&Identity::new("n0call").unwrap()).unwrap();
        assert_eq!(json, "\"N0CALL\"");
    }

    #[test]
    fn test_identity_deserialize_validates() {
        let id: Identity = serde_json::from_str("\"iz1abc\"").unwrap();
        assert_eq!(id.as_str(), "IZ1ABC");
        let bad: Result<Identity, _> = serde_json::from_str("\"not a call\"");
        assert!(bad.is_err());
    }

    // =====================================================================
    // Sequence / MessageNo
    // =====================================================================

    #[test]
    fn test_sequence_renders_two_digits() {
        assert_eq!(Sequence::ZERO.to_string(), "00");
        assert_eq!(Sequence::new(7).unwrap().to_string(), "07");
        assert_eq!(Sequence::new(99).unwrap().to_string(), "99");
    }

    #[test]
    fn test_sequence_next_wraps_at_hundred() {
        assert_eq!(Sequence::new(98).unwrap().next(), Sequence::new(99).unwrap());
        assert_eq!(Sequence::new(99).unwrap().next(), Sequence::ZERO);
    }

    #[test]
    fn test_sequence_new_rejects_out_of_range() {
        assert!(Sequence::new(100).is_err());
    }

    #[test]
    fn test_message_no_as_sequence_only_for_two_digits() {
        assert_eq!(
            MessageNo::new("05").unwrap().as_sequence(),
            Some(Sequence::new(5).unwrap())
        );
        assert_eq!(MessageNo::new("5").unwrap().as_sequence(), None);
        assert_eq!(MessageNo::new("005").unwrap().as_sequence(), None);
        assert_eq!(MessageNo::new("A1").unwrap().as_sequence(), None);
    }

    #[test]
    fn test_message_no_rejects_invalid() {
        assert!(MessageNo::new("").is_err());
        assert!(MessageNo::new("123456").is_err());
        assert!(MessageNo::new("1}2").is_err());
    }

    #[test]
    fn test_message_no_from_sequence() {
        let no: MessageNo = Sequence::new(3).unwrap().into();
        assert_eq!(no.as_str(), "03");
    }
}
