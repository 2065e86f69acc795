//! Session lifecycle state machine.

use std::fmt;

use crate::SessionError;

/// Where a gateway session is in its life.
///
/// ```text
///   Disconnected ──► Connecting ──► LoggedIn ──► Closing ──► Disconnected
///                        │                          ▲
///                        └──── (login write failed) ┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    /// Transport is up; the login line is being written.
    Connecting,
    /// Login written. Frames are being received and dispatched.
    LoggedIn,
    /// Timers stopping, transport closing.
    Closing,
}

impl SessionState {
    /// The successor on the normal path.
    pub fn next(self) -> Self {
        match self {
            SessionState::Disconnected => SessionState::Connecting,
            SessionState::Connecting => SessionState::LoggedIn,
            SessionState::LoggedIn => SessionState::Closing,
            SessionState::Closing => SessionState::Disconnected,
        }
    }

    pub fn can_transition_to(self, to: SessionState) -> bool {
        to == self.next() || (self == SessionState::Connecting && to == SessionState::Closing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::LoggedIn => "logged-in",
            SessionState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Holds the current [`SessionState`] and enforces legal transitions.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: SessionState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Moves to `to`, or fails without changing anything.
    pub fn advance(&mut self, to: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!(from = %self.state, %to, "session state change");
        self.state = to;
        Ok(())
    }
}
