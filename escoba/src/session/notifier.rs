//! Maps session events to human-readable notices.
//!
//! Only wording and severity live here; how a notice is shown is up to the
//! presentation layer.

use serde::Serialize;
use std::fmt;

use crate::game::{CardId, MatchId, MatchOutcome, Username, decode};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Everything the session reports to the player.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    MatchCreated { match_id: MatchId, opponent: Username },
    MatchJoined { match_id: MatchId, opponent: Username },
    /// A play refused before reaching the authority.
    TurnRejectedLocally { reason: String },
    PlayAccepted { card_id: CardId },
    PlayRejectedRemotely { reason: String },
    /// A create, join or play couldn't reach the authority.
    NetworkError { reason: String },
    MatchFinished(MatchOutcome),
    MatchLeft,
    CreateRejected { reason: String },
    JoinRejected { reason: String },
    /// A scheduled poll failed; polling continues.
    PollFailed { reason: String },
}

/// Wording and severity for `kind`, as seen by `local`.
#[must_use]
pub fn describe(kind: &NoticeKind, local: &Username) -> Notice {
    let (message, severity) = match kind {
        NoticeKind::MatchCreated { match_id, opponent } => (
            format!("Match {match_id} created against {opponent}"),
            Severity::Success,
        ),
        NoticeKind::MatchJoined { match_id, opponent } => (
            format!("Joined match {match_id} against {opponent}"),
            Severity::Success,
        ),
        NoticeKind::TurnRejectedLocally { reason } => (reason.clone(), Severity::Error),
        NoticeKind::PlayAccepted { card_id } => {
            let card = decode(*card_id)
                .map(|card| card.full_name)
                .unwrap_or_else(|_| format!("card {card_id}"));
            (format!("Played {card}"), Severity::Success)
        }
        NoticeKind::PlayRejectedRemotely { reason } => {
            (format!("Play rejected: {reason}"), Severity::Error)
        }
        NoticeKind::NetworkError { reason } => (reason.clone(), Severity::Error),
        NoticeKind::MatchFinished(MatchOutcome::Winner(winner)) => (
            format!("Match ended! Winner: {winner}"),
            if winner == local {
                Severity::Success
            } else {
                Severity::Info
            },
        ),
        NoticeKind::MatchFinished(MatchOutcome::Draw) => {
            ("Match ended in a draw".to_string(), Severity::Info)
        }
        NoticeKind::MatchLeft => ("You left the match".to_string(), Severity::Info),
        NoticeKind::CreateRejected { reason } => {
            (format!("Error creating match: {reason}"), Severity::Error)
        }
        NoticeKind::JoinRejected { reason } => {
            (format!("Error joining match: {reason}"), Severity::Error)
        }
        NoticeKind::PollFailed { reason } => (
            format!("Couldn't refresh the match, retrying: {reason}"),
            Severity::Error,
        ),
    };
    Notice { message, severity }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Username {
        Username::new("alice")
    }

    #[test]
    fn test_winner_notice_severity() {
        let won = describe(&NoticeKind::MatchFinished(MatchOutcome::Winner(alice())), &alice());
        assert_eq!(won.message, "Match ended! Winner: alice");
        assert_eq!(won.severity, Severity::Success);

        let lost = describe(
            &NoticeKind::MatchFinished(MatchOutcome::Winner(Username::new("bob"))),
            &alice(),
        );
        assert_eq!(lost.message, "Match ended! Winner: bob");
        assert_eq!(lost.severity, Severity::Info);
    }

    #[test]
    fn test_draw_notice() {
        let notice = describe(&NoticeKind::MatchFinished(MatchOutcome::Draw), &alice());
        assert_eq!(notice.severity, Severity::Info);
        assert!(notice.message.contains("draw"));
    }

    #[test]
    fn test_play_accepted_names_card() {
        let notice = describe(&NoticeKind::PlayAccepted { card_id: 18 }, &alice());
        assert_eq!(notice.message, "Played Jack of Cups");
        assert_eq!(notice.severity, Severity::Success);
    }

    #[test]
    fn test_rejections_are_errors() {
        for kind in [
            NoticeKind::TurnRejectedLocally {
                reason: "It's not your turn!".to_string(),
            },
            NoticeKind::PlayRejectedRemotely {
                reason: "Card not in hand".to_string(),
            },
            NoticeKind::NetworkError {
                reason: "unreachable".to_string(),
            },
            NoticeKind::CreateRejected {
                reason: "player2 not found".to_string(),
            },
        ] {
            assert_eq!(describe(&kind, &alice()).severity, Severity::Error);
        }
    }

    #[test]
    fn test_notice_display() {
        let notice = describe(&NoticeKind::MatchLeft, &alice());
        assert_eq!(notice.to_string(), "[info] You left the match");
    }
}
