//! Connection lifecycle state machine.
//!
//! Models the lifecycle of one session with the wall, with validated
//! transitions that return `Result` instead of panicking.

use std::time::Instant;

use crate::error::WallError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of a session with the wall.
///
/// ```text
///  Idle ──► Connecting ──► Handshaking ──► Exchanging ──► Disconnected ──► Idle
///               │               │               │
///               └───────────────┴───────────────┴───────► Failed ──────► Idle
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No session. Initial state, and where every session ends up.
    #[default]
    Idle,

    /// TCP connect in progress.
    Connecting,

    /// TCP link is up; `connect` sent, waiting for the acknowledgement.
    Handshaking,

    /// Handshake accepted; messages flow both ways.
    Exchanging {
        /// When the session entered `Exchanging`.
        since: Instant,
    },

    /// Session ended normally (local stop or peer `disconnect`).
    Disconnected,

    /// Session ended with an error.
    Failed,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Handshaking => write!(f, "Handshaking"),
            Self::Exchanging { .. } => write!(f, "Exchanging"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl ConnectionPhase {
    /// Returns `true` once the handshake has been accepted.
    pub fn is_exchanging(&self) -> bool {
        matches!(self, Self::Exchanging { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns `true` for `Disconnected` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }

    /// How long the session has been exchanging messages.
    ///
    /// Returns `None` for any other phase.
    pub fn exchanging_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Exchanging { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Idle`.
    pub fn begin_connect(&mut self) -> Result<(), WallError> {
        match self {
            Self::Idle => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(WallError::ProtocolViolation(
                "cannot connect: not in Idle state",
            )),
        }
    }

    /// Transition to `Handshaking`.
    ///
    /// Valid from: `Connecting`.
    pub fn begin_handshake(&mut self) -> Result<(), WallError> {
        match self {
            Self::Connecting => {
                *self = Self::Handshaking;
                Ok(())
            }
            _ => Err(WallError::ProtocolViolation(
                "cannot handshake: not in Connecting state",
            )),
        }
    }

    /// Transition to `Exchanging`.
    ///
    /// Valid from: `Handshaking`.
    pub fn complete_handshake(&mut self) -> Result<(), WallError> {
        match self {
            Self::Handshaking => {
                *self = Self::Exchanging {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(WallError::ProtocolViolation(
                "cannot complete handshake: not in Handshaking state",
            )),
        }
    }

    /// Transition to `Disconnected`.
    ///
    /// Valid from: `Connecting`, `Handshaking` (stop before the session
    /// was established), `Exchanging`.
    pub fn disconnect(&mut self) -> Result<(), WallError> {
        match self {
            Self::Connecting | Self::Handshaking | Self::Exchanging { .. } => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(WallError::ProtocolViolation(
                "cannot disconnect: no session in progress",
            )),
        }
    }

    /// Transition to `Failed`.
    ///
    /// Valid from: `Connecting`, `Handshaking`, `Exchanging`.
    pub fn fail(&mut self) -> Result<(), WallError> {
        match self {
            Self::Connecting | Self::Handshaking | Self::Exchanging { .. } => {
                *self = Self::Failed;
                Ok(())
            }
            _ => Err(WallError::ProtocolViolation(
                "cannot fail: no session in progress",
            )),
        }
    }

    /// Transition back to `Idle` after cleanup.
    ///
    /// Valid from: `Disconnected`, `Failed`.
    pub fn reset(&mut self) -> Result<(), WallError> {
        match self {
            Self::Disconnected | Self::Failed => {
                *self = Self::Idle;
                Ok(())
            }
            _ => Err(WallError::ProtocolViolation(
                "cannot reset: session has not ended",
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = ConnectionPhase::Idle;

        phase.begin_connect().unwrap();
        assert_eq!(phase, ConnectionPhase::Connecting);

        phase.begin_handshake().unwrap();
        assert_eq!(phase, ConnectionPhase::Handshaking);

        phase.complete_handshake().unwrap();
        assert!(phase.is_exchanging());
        assert!(phase.exchanging_duration().is_some());

        phase.disconnect().unwrap();
        assert!(phase.is_terminal());

        phase.reset().unwrap();
        assert!(phase.is_idle());
    }

    #[test]
    fn connect_failure_path() {
        let mut phase = ConnectionPhase::Idle;
        phase.begin_connect().unwrap();
        phase.fail().unwrap();
        assert_eq!(phase, ConnectionPhase::Failed);
        phase.reset().unwrap();
        assert!(phase.is_idle());
    }

    #[test]
    fn invalid_transition_connect_when_exchanging() {
        let mut phase = ConnectionPhase::Exchanging {
            since: Instant::now(),
        };
        assert!(phase.begin_connect().is_err());
    }

    #[test]
    fn invalid_transition_handshake_from_idle() {
        let mut phase = ConnectionPhase::Idle;
        assert!(phase.begin_handshake().is_err());
        assert!(phase.complete_handshake().is_err());
    }

    #[test]
    fn terminal_states_cannot_fail_again() {
        let mut phase = ConnectionPhase::Disconnected;
        assert!(phase.fail().is_err());
        assert!(phase.disconnect().is_err());
    }

    #[test]
    fn reset_requires_terminal_state() {
        let mut phase = ConnectionPhase::Connecting;
        assert!(phase.reset().is_err());
    }

    #[test]
    fn display_format() {
        assert_eq!(ConnectionPhase::Idle.to_string(), "Idle");
        assert_eq!(ConnectionPhase::Connecting.to_string(), "Connecting");
        assert_eq!(ConnectionPhase::Handshaking.to_string(), "Handshaking");
        assert_eq!(
            ConnectionPhase::Exchanging {
                since: Instant::now()
            }
            .to_string(),
            "Exchanging"
        );
        assert_eq!(ConnectionPhase::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionPhase::Failed.to_string(), "Failed");
    }

    #[test]
    fn default_phase_is_idle() {
        assert!(ConnectionPhase::default().is_idle());
    }
}
