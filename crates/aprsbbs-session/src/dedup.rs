//! Suppresses re-execution of retried inbound messages.
//!
//! APRS clients resend a numbered message until they see our ack. If an
//! ack is lost, the same `(sender, number)` arrives again and must be
//! acked again but not executed twice.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use aprsbbs_protocol::{Identity, MessageNo};

/// Remembers recently seen `(sender, message number)` pairs.
pub struct DuplicateFilter {
    window: Duration,
    seen: HashMap<(Identity, MessageNo), Instant>,
}

impl DuplicateFilter {
    /// Default memory: 30 minutes.
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30 * 60);

    /// A zero `window` disables the filter.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Records a message and reports whether it is a repeat.
    ///
    /// Returns `true` when the same pair was seen less than `window`
    /// ago. A repeat does not extend the window.
    pub fn is_duplicate(&mut self, sender: &Identity, message_no: &MessageNo, now: Instant) -> bool {
        if self.window.is_zero() {
            return false;
        }
        let window = self.window;
        self.seen
            .retain(|_, first_seen| now.saturating_duration_since(*first_seen) < window);

        let key = (sender.clone(), message_no.clone());
        if self.seen.contains_key(&key) {
            return true;
        }
        self.seen.insert(key, now);
        false
    }

    /// Pairs currently remembered.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}
