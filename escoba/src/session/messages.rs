//! Session actor message types.

use serde::Serialize;
use tokio::sync::oneshot;

use super::{errors::SessionResult, notifier::Notice, state::SessionPhase};
use crate::game::{CardId, MatchId, MatchView, Username};

/// Messages that can be sent to a SessionActor
#[derive(Debug)]
pub enum SessionMessage {
    /// Create a match against an opponent
    Create {
        opponent: Username,
        response: oneshot::Sender<SessionResult<MatchId>>,
    },

    /// Create a match against the built-in bot
    QuickMatch {
        response: oneshot::Sender<SessionResult<MatchId>>,
    },

    /// Join an existing match as the local player
    Join {
        match_id: MatchId,
        response: oneshot::Sender<SessionResult<SessionPhase>>,
    },

    /// Play a card from the local hand
    Play {
        card_id: CardId,
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Leave the current match, finished or not
    Leave { response: oneshot::Sender<bool> },

    /// Close a finished match
    Dismiss {
        response: oneshot::Sender<SessionResult<bool>>,
    },

    /// Start a new match against the opponent of the finished one
    Rematch {
        response: oneshot::Sender<SessionResult<MatchId>>,
    },

    /// Fetch the match state now instead of waiting for the next tick
    Refresh {
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Get the current session status
    GetStatus {
        response: oneshot::Sender<SessionStatus>,
    },

    /// Stop the actor
    Shutdown,
}

/// Pushed to the presentation layer whenever something visible changes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SessionUpdate {
    Snapshot(MatchView),
    Notice(Notice),
    Phase(SessionPhase),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionStatus {
    pub local: Username,
    pub phase: SessionPhase,
    pub match_id: Option<MatchId>,
    pub opponent: Option<Username>,
    pub view: Option<MatchView>,
    pub poll_failures: u32,
}
