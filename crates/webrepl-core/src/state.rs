//! Connection state machine.
//!
//!   Connecting → Open → Authenticating → Ready
//!   any → Errored (transport error)
//!   any → Closing → Closed (explicit close or transport close)
//!
//! Closed is absorbing. Errored can still move to Closed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Authenticating,
    Ready,
    Closing,
    Closed,
    Errored,
}

impl ConnectionState {
    /// No more data will arrive in this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }

    /// Apply a transition, returning the resulting state.
    ///
    /// Illegal transitions leave the state unchanged.
    pub fn advance(self, next: ConnectionState) -> ConnectionState {
        use ConnectionState::*;
        let allowed = match (self, next) {
            (Closed, _) => false,
            (_, Closed) | (_, Errored) => true,
            (Errored, _) => false,
            (Connecting, Open) => true,
            // The handshake may start before the open event lands.
            (Connecting | Open, Authenticating) => true,
            (Authenticating, Ready) => true,
            (_, Closing) => true,
            _ => false,
        };
        if allowed {
            next
        } else {
            self
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Errored => "errored",
        };
        f.write_str(s)
    }
}
