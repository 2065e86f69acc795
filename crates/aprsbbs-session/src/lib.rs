//! Session bookkeeping for the aprsbbs gateway.
//!
//! This crate holds the state a gateway session accumulates while it is
//! logged in:
//!
//! 1. **Lifecycle**: which phase the session is in ([`SessionState`])
//! 2. **Acknowledgements**: numbering outgoing messages and retrying the
//!    ones nobody acked ([`AckTracker`])
//! 3. **Duplicates**: recognizing inbound messages the sender retried
//!    because our ack got lost ([`DuplicateFilter`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Gateway (above)   ← owns one of each per session, behind mutexes
//!     ↕
//! Session Layer (this crate)   ← pure state, no I/O, caller supplies `now`
//!     ↕
//! Protocol Layer (below)   ← Identity, Sequence, MessageNo, encode()
//! ```

mod config;
mod dedup;
mod error;
mod state;
mod tracker;

pub use config::AckConfig;
pub use dedup::DuplicateFilter;
pub use error::SessionError;
pub use state::{Lifecycle, SessionState};
pub use tracker::{AckTracker, DueSends, MAX_TEXT_LEN, PendingAck, TrackedSend, sanitize_text, split_text};
