//! Acknowledgement tracker: numbers outgoing messages and retries them
//! until the recipient acks.
//!
//! ```text
//! prepare() ──► {NN sent ──► ackNN received ──► acknowledge() ──► gone
//!                   │
//!                   ▼ retry_timeout elapsed
//!              collect_due() ──► resend (attempts + 1)
//!                   │
//!                   ▼ attempts == max_attempts
//!              abandoned, "delivery failed" logged
//! ```
//!
//! # Concurrency note
//!
//! Plain `HashMap`s, no locking. The gateway shares one tracker between
//! the receive loop and the retry timer behind a single mutex, and never
//! holds that mutex across a transport write.

use std::collections::HashMap;
use std::time::Instant;

use aprsbbs_protocol::{Frame, Identity, MessageFrame, MessageNo, Sequence, encode};
use tracing::{debug, warn};

use crate::{AckConfig, SessionError};

/// Longest message text, in characters, a tracked message may carry.
pub const MAX_TEXT_LEN: usize = 67;

/// Makes arbitrary text safe to carry in a message frame.
///
/// Drops `{`, `|`, `~`, CR and LF, then truncates to [`MAX_TEXT_LEN`]
/// characters.
pub fn sanitize_text(body: &str) -> String {
    body.chars()
        .filter(|c| !is_reserved(*c))
        .take(MAX_TEXT_LEN)
        .collect()
}

/// Breaks `body` into message texts of at most [`MAX_TEXT_LEN`]
/// characters, each one starting with `prefix`.
///
/// Reserved characters are dropped from both parts first. Nothing of
/// `body` is lost; an empty body gives one text holding only the prefix.
pub fn split_text(prefix: &str, body: &str) -> Vec<String> {
    let prefix: String = prefix
        .chars()
        .filter(|c| !is_reserved(*c))
        .take(MAX_TEXT_LEN - 1)
        .collect();
    let room = MAX_TEXT_LEN - prefix.chars().count();

    let body: Vec<char> = body.chars().filter(|c| !is_reserved(*c)).collect();
    if body.is_empty() {
        return vec![prefix];
    }
    body.chunks(room)
        .map(|chunk| {
            let mut text = prefix.clone();
            text.extend(chunk);
            text
        })
        .collect()
}

fn is_reserved(c: char) -> bool {
    matches!(c, '{' | '|' | '~' | '\r' | '\n')
}

/// A sent message still waiting for its ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAck {
    pub recipient: Identity,
    pub sequence: Sequence,
    /// The exact line that was written, reused verbatim for resends.
    pub frame_text: String,
    pub sent_at: Instant,
    /// Transmissions so far, the first one included.
    pub attempts: u32,
}

/// A freshly numbered message, ready to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSend {
    pub sequence: Sequence,
    pub line: String,
}

/// Result of one retry scan.
#[derive(Debug, Default)]
pub struct DueSends {
    /// Lines to write again, oldest first.
    pub resend: Vec<String>,
    /// Entries that used up their attempts and were dropped.
    pub abandoned: Vec<PendingAck>,
}

/// Per-recipient sequence counters and the table of unacked sends.
pub struct AckTracker {
    local: Identity,
    config: AckConfig,
    /// Next sequence to hand out, per recipient.
    next_sequence: HashMap<Identity, Sequence>,
    pending: HashMap<(Identity, Sequence), PendingAck>,
}

impl AckTracker {
    /// Creates a tracker that signs frames as `local`.
    pub fn new(local: Identity, config: AckConfig) -> Self {
        Self {
            local,
            config,
            next_sequence: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn config(&self) -> &AckConfig {
        &self.config
    }

    /// Numbers, encodes and records a message for `recipient`.
    ///
    /// The first message to a recipient gets sequence `00`, then each
    /// one after gets the next number mod 100. A still-pending entry
    /// with the same number (100 sends ago) is replaced.
    pub fn prepare(
        &mut self,
        recipient: &Identity,
        body: &str,
        now: Instant,
    ) -> Result<TrackedSend, SessionError> {
        let sequence = self
            .next_sequence
            .get(recipient)
            .copied()
            .unwrap_or(Sequence::ZERO);

        let frame = MessageFrame::new(
            self.local.clone(),
            recipient.clone(),
            sanitize_text(body),
            Some(sequence.into()),
        );
        let line = encode(&Frame::Message(frame))?;

        self.next_sequence.insert(recipient.clone(), sequence.next());
        let stale = self.pending.insert(
            (recipient.clone(), sequence),
            PendingAck {
                recipient: recipient.clone(),
                sequence,
                frame_text: line.clone(),
                sent_at: now,
                attempts: 1,
            },
        );
        if stale.is_some() {
            debug!(%recipient, %sequence, "replaced stale pending entry");
        }
        debug!(%recipient, %sequence, "tracked message prepared");

        Ok(TrackedSend { sequence, line })
    }

    /// Clears the entry an ack (or rej) refers to.
    ///
    /// Returns `false` for acks that match nothing: duplicates, late
    /// arrivals, or numbers we never sent. Those are expected and
    /// harmless.
    pub fn acknowledge(&mut self, from: &Identity, message_no: &MessageNo) -> bool {
        let Some(sequence) = message_no.as_sequence() else {
            debug!(%from, %message_no, "ack for a number we never issue");
            return false;
        };
        match self.pending.remove(&(from.clone(), sequence)) {
            Some(entry) => {
                debug!(%from, %sequence, attempts = entry.attempts, "message acknowledged");
                true
            }
            None => {
                debug!(%from, %sequence, "unmatched ack ignored");
                false
            }
        }
    }

    /// Finds every entry older than the retry timeout.
    ///
    /// Entries with attempts left are stamped `now`, counted, and their
    /// line returned for resending. The rest are removed and logged as
    /// failed deliveries.
    pub fn collect_due(&mut self, now: Instant) -> DueSends {
        let timeout = self.config.retry_timeout();
        let mut due: Vec<(Identity, Sequence)> = self
            .pending
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.sent_at) >= timeout)
            .map(|(key, _)| key.clone())
            .collect();
        due.sort_by_key(|key| self.pending.get(key).map(|e| e.sent_at));

        let mut out = DueSends::default();
        for key in due {
            let Some(entry) = self.pending.get_mut(&key) else {
                continue;
            };
            if entry.attempts < self.config.max_attempts {
                entry.attempts += 1;
                entry.sent_at = now;
                debug!(
                    recipient = %entry.recipient,
                    sequence = %entry.sequence,
                    attempt = entry.attempts,
                    "resending unacknowledged message"
                );
                out.resend.push(entry.frame_text.clone());
            } else if let Some(entry) = self.pending.remove(&key) {
                warn!(
                    recipient = %entry.recipient,
                    sequence = %entry.sequence,
                    attempts = entry.attempts,
                    "delivery failed, no ack received"
                );
                out.abandoned.push(entry);
            }
        }
        out
    }

    /// Drops every pending entry. Returns how many there were.
    pub fn abandon_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, recipient: &Identity, sequence: Sequence) -> bool {
        self.pending.contains_key(&(recipient.clone(), sequence))
    }

    /// Looks at an entry without changing it.
    pub fn pending(&self, recipient: &Identity, sequence: Sequence) -> Option<&PendingAck> {
        self.pending.get(&(recipient.clone(), sequence))
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn id(call: &str) -> Identity {
        Identity::new(call).unwrap()
    }

    fn seq(n: u8) -> Sequence {
        Sequence::new(n).unwrap()
    }

    fn tracker() -> AckTracker {
        AckTracker::new(id("N0CALL"), AckConfig::default())
    }

    // =====================================================================
    // sanitize_text()
    // =====================================================================

    #[test]
    fn test_sanitize_text_strips_reserved_characters() {
        assert_eq!(sanitize_text("a{b|c~d\r\ne"), "abcde");
    }

    #[test]
    fn test_sanitize_text_truncates_to_limit() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_text(&long).chars().count(), MAX_TEXT_LEN);
    }

    #[test]
    fn test_sanitize_text_counts_characters_not_bytes() {
        let accented = "é".repeat(70);
        assert_eq!(sanitize_text(&accented), "é".repeat(MAX_TEXT_LEN));
    }

    // =====================================================================
    // split_text()
    // =====================================================================

    #[test]
    fn test_split_text_short_body_is_one_text() {
        assert_eq!(split_text("From K1XYZ: ", "hello"), vec!["From K1XYZ: hello"]);
    }

    #[test]
    fn test_split_text_long_body_keeps_every_character() {
        let body: String = ('a'..='z').cycle().take(58).collect();
        let prefix = "From K1XYZ-10: ";
        let texts = split_text(prefix, &body);

        assert_eq!(texts.len(), 2);
        assert!(texts.iter().all(|t| t.starts_with(prefix)));
        assert!(texts.iter().all(|t| t.chars().count() <= MAX_TEXT_LEN));
        assert_eq!(texts[0].chars().count(), MAX_TEXT_LEN);
        let joined: String = texts.iter().map(|t| &t[prefix.len()..]).collect();
        assert_eq!(joined, body);
    }

    #[test]
    fn test_split_text_strips_reserved_characters() {
        assert_eq!(split_text("[a] ", "x{y|z~\r\n"), vec!["[a] xyz"]);
        assert_eq!(split_text("From K1XYZ: ", ""), vec!["From K1XYZ: "]);
    }

    #[test]
    fn test_split_text_oversized_prefix_still_carries_body() {
        let prefix = "p".repeat(100);
        let texts = split_text(&prefix, "ab");
        assert_eq!(texts.len(), 2);
        assert!(texts.iter().all(|t| t.chars().count() == MAX_TEXT_LEN));
        assert!(texts[0].ends_with('a'));
        assert!(texts[1].ends_with('b'));
    }

    // =====================================================================
    // prepare()
    // =====================================================================

    #[test]
    fn test_prepare_first_send_uses_sequence_zero() {
        let mut t = tracker();
        let sent = t.prepare(&id("IZ1ABC"), "No new messages.", Instant::now()).unwrap();
        assert_eq!(sent.sequence, Sequence::ZERO);
        assert_eq!(sent.line, "N0CALL>APRS,TCPIP*::IZ1ABC   :No new messages.{00");
        assert!(t.is_pending(&id("IZ1ABC"), Sequence::ZERO));
    }

    #[test]
    fn test_prepare_sequences_are_per_recipient() {
        let mut t = tracker();
        let now = Instant::now();
        t.prepare(&id("IZ1ABC"), "a", now).unwrap();
        t.prepare(&id("IZ1ABC"), "b", now).unwrap();
        let other = t.prepare(&id("K1XYZ"), "c", now).unwrap();
        let third = t.prepare(&id("IZ1ABC"), "d", now).unwrap();
        assert_eq!(other.sequence, seq(0));
        assert_eq!(third.sequence, seq(2));
    }

    #[test]
    fn test_prepare_wraps_after_99_and_replaces_stale_entry() {
        let mut t = tracker();
        let now = Instant::now();
        let to = id("IZ1ABC");
        let sequences: Vec<Sequence> = (0..101)
            .map(|n| t.prepare(&to, &format!("m{n}"), now).unwrap().sequence)
            .collect();
        assert_eq!(sequences[99], seq(99));
        assert_eq!(sequences[100], seq(0));
        // 100 distinct keys; the 101st send replaced the first.
        assert_eq!(t.pending_len(), 100);
        assert!(t.pending(&to, seq(0)).unwrap().frame_text.contains("m100"));
    }

    #[test]
    fn test_prepare_sanitizes_body() {
        let mut t = tracker();
        let sent = t.prepare(&id("IZ1ABC"), "pipe|brace{", Instant::now()).unwrap();
        assert_eq!(sent.line, "N0CALL>APRS,TCPIP*::IZ1ABC   :pipebrace{00");
    }

    // =====================================================================
    // acknowledge()
    // =====================================================================

    #[test]
    fn test_acknowledge_removes_entry_once() {
        let mut t = tracker();
        let sent = t.prepare(&id("IZ1ABC"), "hi", Instant::now()).unwrap();
        let no = MessageNo::from(sent.sequence);
        assert!(t.acknowledge(&id("IZ1ABC"), &no));
        assert!(!t.acknowledge(&id("IZ1ABC"), &no));
        assert_eq!(t.pending_len(), 0);
    }

    #[test]
    fn test_acknowledge_from_wrong_station_is_ignored() {
        let mut t = tracker();
        t.prepare(&id("IZ1ABC"), "hi", Instant::now()).unwrap();
        assert!(!t.acknowledge(&id("IZ1ABC-5"), &MessageNo::new("00").unwrap()));
        assert!(!t.acknowledge(&id("K1XYZ"), &MessageNo::new("00").unwrap()));
        assert_eq!(t.pending_len(), 1);
    }

    #[test]
    fn test_acknowledge_foreign_number_format_is_ignored() {
        let mut t = tracker();
        t.prepare(&id("IZ1ABC"), "hi", Instant::now()).unwrap();
        assert!(!t.acknowledge(&id("IZ1ABC"), &MessageNo::new("0").unwrap()));
        assert!(!t.acknowledge(&id("IZ1ABC"), &MessageNo::new("AB").unwrap()));
        assert_eq!(t.pending_len(), 1);
    }

    // =====================================================================
    // collect_due()
    // =====================================================================

    #[test]
    fn test_collect_due_nothing_before_timeout() {
        let mut t = tracker();
        let start = Instant::now();
        t.prepare(&id("IZ1ABC"), "hi", start).unwrap();
        let due = t.collect_due(start + Duration::from_secs(29));
        assert!(due.resend.is_empty());
        assert!(due.abandoned.is_empty());
    }

    #[test]
    fn test_collect_due_resends_then_abandons() {
        let mut t = tracker();
        let start = Instant::now();
        let sent = t.prepare(&id("IZ1ABC"), "hi", start).unwrap();
        let step = Duration::from_secs(30);

        let first = t.collect_due(start + step);
        assert_eq!(first.resend, vec![sent.line.clone()]);
        assert_eq!(t.pending(&id("IZ1ABC"), sent.sequence).unwrap().attempts, 2);

        let second = t.collect_due(start + step * 2);
        assert_eq!(second.resend, vec![sent.line.clone()]);

        let third = t.collect_due(start + step * 3);
        assert!(third.resend.is_empty());
        assert_eq!(third.abandoned.len(), 1);
        assert_eq!(third.abandoned[0].attempts, 3);
        assert_eq!(t.pending_len(), 0);
    }

    #[test]
    fn test_collect_due_resend_restarts_timer() {
        let mut t = tracker();
        let start = Instant::now();
        t.prepare(&id("IZ1ABC"), "hi", start).unwrap();
        t.collect_due(start + Duration::from_secs(30));
        // Only 10s since the resend.
        let due = t.collect_due(start + Duration::from_secs(40));
        assert!(due.resend.is_empty());
    }

    #[test]
    fn test_collect_due_orders_resends_oldest_first() {
        let mut t = tracker();
        let start = Instant::now();
        let a = t.prepare(&id("K1XYZ"), "older", start).unwrap();
        let b = t
            .prepare(&id("IZ1ABC"), "newer", start + Duration::from_secs(1))
            .unwrap();
        let due = t.collect_due(start + Duration::from_secs(60));
        assert_eq!(due.resend, vec![a.line, b.line]);
    }

    #[test]
    fn test_abandon_all_clears_and_counts() {
        let mut t = tracker();
        let now = Instant::now();
        t.prepare(&id("IZ1ABC"), "a", now).unwrap();
        t.prepare(&id("K1XYZ"), "b", now).unwrap();
        assert_eq!(t.abandon_all(), 2);
        assert_eq!(t.pending_len(), 0);
        assert_eq!(t.abandon_all(), 0);
    }
}
