use std::fmt;

use aprsbbs_protocol::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mailbox-assigned message identifier, unique across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A private message waiting for its recipient to log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub id: MessageId,
    pub recipient: Identity,
    pub sender: Identity,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Flips to `true` once, when the text has been handed to the outbox.
    pub delivered: bool,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn message() -> PendingMessage {
        PendingMessage {
            id: MessageId(7),
            recipient: Identity::new("K1XYZ").unwrap(),
            sender: Identity::new("IZ1ABC-9").unwrap(),
            body: "net at 8pm".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            delivered: true,
        }
    }

    #[test]
    fn test_message_id_serializes_as_bare_number() {
        assert_eq!(serde_json::to_string(&MessageId(42)).unwrap(), "42");
        assert_eq!(serde_json::from_str::<MessageId>("42").unwrap(), MessageId(42));
        assert_eq!(MessageId(42).to_string(), "#42");
    }

    #[test]
    fn test_pending_message_json_shape() {
        let value = serde_json::to_value(message()).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["recipient"], "K1XYZ");
        assert_eq!(value["sender"], "IZ1ABC-9");
        assert_eq!(value["delivered"], true);

        let back: PendingMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, message());
    }

    #[test]
    fn test_pending_message_rejects_bad_identity() {
        let mut value = serde_json::to_value(message()).unwrap();
        value["recipient"] = "not a call".into();
        assert!(serde_json::from_value::<PendingMessage>(value).is_err());
    }
}
