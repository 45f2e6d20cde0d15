//! Session error types.

use thiserror::Error;

use super::state::SessionPhase;
use crate::game::{CardId, DecodeError};
use crate::net::errors::TransportError;

/// An action refused locally, before anything was sent to the authority.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum LocalRejection {
    /// The last known snapshot says someone else is to move (or there is no
    /// snapshot yet).
    #[error("It's not your turn!")]
    NotYourTurn,

    #[error("Card {0} is not in your hand")]
    CardNotInHand(CardId),

    #[error("No active match")]
    NoActiveMatch,

    #[error("The match is already over")]
    MatchAlreadyFinished,

    #[error("The match is still in progress")]
    MatchStillActive,

    #[error("You are not a participant of match {0}")]
    NotAParticipant(String),

    #[error("Rematch isn't offered against {0}")]
    RematchUnavailable(String),

    #[error("Can't {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },
}

/// Session errors
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SessionError {
    /// The authority couldn't be reached or refused the request
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Refused locally, no network call was made
    #[error(transparent)]
    Rejected(#[from] LocalRejection),

    /// A card id outside the deck
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The session actor is no longer running
    #[error("Session is closed")]
    Closed,
}

impl SessionError {
    /// Whether the failure happened before any network call.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Decode(_))
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_convert() {
        let err: SessionError = TransportError::Protocol("Not your turn".to_string()).into();
        assert_eq!(err.to_string(), "Not your turn");
        assert!(!err.is_local());
    }

    #[test]
    fn test_local_rejections_are_local() {
        let err: SessionError = LocalRejection::NotYourTurn.into();
        assert!(err.is_local());
        let err: SessionError = DecodeError::OutOfRange(41).into();
        assert!(err.is_local());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = LocalRejection::InvalidTransition {
            action: "play",
            phase: SessionPhase::Finished,
        };
        assert_eq!(err.to_string(), "Can't play while finished");
    }
}
