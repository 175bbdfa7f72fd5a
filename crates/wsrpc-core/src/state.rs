//! Connection lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bootstrap state of one connection.
///
/// Transitions are monotonic:
/// `Connecting → Authenticating → ScopingSession → Ready | Failed`.
/// `Failed` can be entered from any non-terminal state; nothing leaves a
/// terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Opening the transport.
    Connecting,
    /// Obtaining a token and sending `authenticate`.
    Authenticating,
    /// Sending `use`.
    ScopingSession,
    /// Handshake complete; operations go straight to the wire.
    Ready,
    /// Handshake failed; the connection is unusable.
    Failed,
}

impl ConnectionState {
    /// Position in the lifecycle. Both terminal states share the last rank.
    fn rank(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Authenticating => 1,
            Self::ScopingSession => 2,
            Self::Ready | Self::Failed => 3,
        }
    }

    /// Whether the state is `Ready` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    /// Whether moving from `self` to `next` respects the lifecycle order.
    pub fn can_advance_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::ScopingSession => write!(f, "scoping_session"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_allowed() {
        use ConnectionState::{Authenticating, Connecting, Failed, Ready, ScopingSession};
        assert!(Connecting.can_advance_to(Authenticating));
        assert!(Authenticating.can_advance_to(ScopingSession));
        assert!(ScopingSession.can_advance_to(Ready));
        assert!(Connecting.can_advance_to(Failed));
        assert!(Authenticating.can_advance_to(Failed));
    }

    #[test]
    fn backward_and_terminal_transitions_rejected() {
        use ConnectionState::{Authenticating, Failed, Ready, ScopingSession};
        assert!(!ScopingSession.can_advance_to(Authenticating));
        assert!(!Authenticating.can_advance_to(Authenticating));
        assert!(!Ready.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Ready));
    }

    #[test]
    fn terminal_states() {
        assert!(ConnectionState::Ready.is_terminal());
        assert!(ConnectionState::Failed.is_terminal());
        assert!(!ConnectionState::Connecting.is_terminal());
    }
}
