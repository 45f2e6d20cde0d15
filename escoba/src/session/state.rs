//! The match session state machine.
//!
//! [`MatchSession`] holds everything one local player knows about their
//! current match and decides every lifecycle transition. It performs no I/O:
//! the actor asks it what to do (a [`FetchTicket`], a [`PlayTicket`]), runs
//! the network call, and reports the result back. That keeps every
//! transition deterministic and testable without a runtime.
//!
//! ```text
//! Idle ──create──▶ Creating ──ok──▶ Polling ──finished──▶ Finished ──dismiss──▶ Left
//!   │                 └──err──▶ Idle   │  ▲                  │
//!   └───join────▶ Joining ──ok──▶ ─────┘  └─tick / play─┘     └──leave──▶ Left
//!                     └──err──▶ Idle        Polling ──leave──▶ Left
//! ```
//!
//! Every adoption of a match and every teardown bumps the session's
//! [`Epoch`]. Work started under one epoch (timer ticks, in-flight fetches)
//! is discarded if it completes under another, so nothing from a torn-down
//! match can leak into the next one.

use serde::Serialize;
use std::fmt;

use super::errors::{LocalRejection, SessionError};
use crate::game::{CardId, MatchId, MatchOutcome, MatchSnapshot, Username, decode};

/// Generation token of a session. Monotonically increasing.
pub type Epoch = u64;

/// Order in which fetches were initiated. Monotonically increasing.
pub type FetchSeq = u64;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum SessionPhase {
    Idle,
    Creating,
    Joining,
    Polling,
    Finished,
    Left,
}

impl SessionPhase {
    /// `Idle` and `Left` both mean "no match".
    #[must_use]
    pub fn has_match(self) -> bool {
        matches!(self, Self::Polling | Self::Finished)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Idle => "idle",
            Self::Creating => "creating a match",
            Self::Joining => "joining a match",
            Self::Polling => "playing",
            Self::Finished => "finished",
            Self::Left => "left",
        };
        write!(f, "{repr}")
    }
}

/// A match the session has adopted.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveMatch {
    pub match_id: MatchId,
    pub opponent: Option<Username>,
    pub snapshot: Option<MatchSnapshot>,
}

impl ActiveMatch {
    fn new(match_id: MatchId, opponent: Option<Username>) -> Self {
        Self {
            match_id,
            opponent,
            snapshot: None,
        }
    }
}

#[derive(Debug)]
enum Lifecycle {
    Idle,
    Creating { opponent: Username },
    Joining { match_id: MatchId },
    Polling(ActiveMatch),
    Finished(ActiveMatch),
    Left,
}

/// Permission to fetch the match state once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchTicket {
    pub epoch: Epoch,
    pub seq: FetchSeq,
    pub match_id: MatchId,
    pub as_player: Username,
}

/// Permission to send one play to the authority.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayTicket {
    pub epoch: Epoch,
    pub match_id: MatchId,
    pub as_player: Username,
    pub card_id: CardId,
}

/// What a scheduler tick should do.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TickDecision {
    Fetch(FetchTicket),
    /// A post-play fetch already covered this interval.
    Skip,
    /// The tick was armed for a match that is no longer polled.
    Stale,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiscardReason {
    StaleEpoch,
    NotPolling,
    OutOfOrder,
    WrongMatch,
}

/// Result of offering a fetched snapshot to the session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Applied {
    Updated,
    /// The snapshot reports the match as finished. Returned exactly once per
    /// match, on the transition into [`SessionPhase::Finished`].
    Finished(MatchOutcome),
    Discarded(DiscardReason),
}

/// One local player's participation in at most one match.
#[derive(Debug)]
pub struct MatchSession {
    local: Username,
    lifecycle: Lifecycle,
    epoch: Epoch,
    next_seq: FetchSeq,
    applied_seq: FetchSeq,
    skip_next_tick: bool,
    poll_failures: u32,
}

impl MatchSession {
    pub fn new(local: Username) -> Self {
        Self {
            local,
            lifecycle: Lifecycle::Idle,
            epoch: 0,
            next_seq: 1,
            applied_seq: 0,
            skip_next_tick: false,
            poll_failures: 0,
        }
    }

    #[must_use]
    pub fn local(&self) -> &Username {
        &self.local
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match self.lifecycle {
            Lifecycle::Idle => SessionPhase::Idle,
            Lifecycle::Creating { .. } => SessionPhase::Creating,
            Lifecycle::Joining { .. } => SessionPhase::Joining,
            Lifecycle::Polling(_) => SessionPhase::Polling,
            Lifecycle::Finished(_) => SessionPhase::Finished,
            Lifecycle::Left => SessionPhase::Left,
        }
    }

    #[must_use]
    pub fn active(&self) -> Option<&ActiveMatch> {
        match &self.lifecycle {
            Lifecycle::Polling(active) | Lifecycle::Finished(active) => Some(active),
            _ => None,
        }
    }

    #[must_use]
    pub fn match_id(&self) -> Option<&MatchId> {
        match &self.lifecycle {
            Lifecycle::Joining { match_id } => Some(match_id),
            _ => self.active().map(|active| &active.match_id),
        }
    }

    #[must_use]
    pub fn opponent(&self) -> Option<&Username> {
        match &self.lifecycle {
            Lifecycle::Creating { opponent } => Some(opponent),
            _ => self.active().and_then(|active| active.opponent.as_ref()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&MatchSnapshot> {
        self.active().and_then(|active| active.snapshot.as_ref())
    }

    /// Consecutive failed polls since the last applied snapshot.
    #[must_use]
    pub fn poll_failures(&self) -> u32 {
        self.poll_failures
    }

    /// Start creating a match against `opponent`. Any current match is torn
    /// down first.
    pub fn begin_create(&mut self, opponent: Username) {
        self.teardown();
        self.lifecycle = Lifecycle::Creating { opponent };
    }

    /// The authority opened the match. Moves to polling and returns the new
    /// epoch. Ignored unless a create is in progress.
    pub fn create_succeeded(&mut self, match_id: MatchId) -> Option<Epoch> {
        let Lifecycle::Creating { opponent } = &self.lifecycle else {
            return None;
        };
        let active = ActiveMatch::new(match_id, Some(opponent.clone()));
        Some(self.adopt(Lifecycle::Polling(active)))
    }

    /// Creation failed: back to idle without adopting any match id.
    pub fn create_failed(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Creating { .. }) {
            self.lifecycle = Lifecycle::Idle;
        }
    }

    /// Start joining `match_id`. Any current match is torn down first.
    pub fn begin_join(&mut self, match_id: MatchId) {
        self.teardown();
        self.lifecycle = Lifecycle::Joining { match_id };
    }

    /// The first fetch of a joined match succeeded. The opponent is whichever
    /// participant isn't the local player; a snapshot that doesn't list the
    /// local player at all is refused and the session returns to idle.
    pub fn join_succeeded(&mut self, snapshot: MatchSnapshot) -> Result<Applied, LocalRejection> {
        let Lifecycle::Joining { match_id } = &self.lifecycle else {
            return Ok(Applied::Discarded(DiscardReason::NotPolling));
        };

        if &snapshot.match_id != match_id {
            let match_id = match_id.to_string();
            self.lifecycle = Lifecycle::Idle;
            return Err(LocalRejection::NotAParticipant(match_id));
        }

        let Some(opponent) = snapshot.opponent_of(&self.local).cloned() else {
            self.lifecycle = Lifecycle::Idle;
            return Err(LocalRejection::NotAParticipant(snapshot.match_id.to_string()));
        };

        let active = ActiveMatch::new(snapshot.match_id.clone(), Some(opponent));
        let epoch = self.adopt(Lifecycle::Polling(active));
        let seq = self.allocate_seq();
        Ok(self.apply_fetch(epoch, seq, snapshot))
    }

    pub fn join_failed(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Joining { .. }) {
            self.lifecycle = Lifecycle::Idle;
        }
    }

    /// Ticket for one fetch of the polled match.
    pub fn next_fetch(&mut self) -> Option<FetchTicket> {
        let match_id = match &self.lifecycle {
            Lifecycle::Polling(active) => active.match_id.clone(),
            _ => return None,
        };
        Some(FetchTicket {
            epoch: self.epoch,
            seq: self.allocate_seq(),
            match_id,
            as_player: self.local.clone(),
        })
    }

    /// Decide what a scheduler tick armed under `epoch` should do.
    pub fn take_tick(&mut self, epoch: Epoch) -> TickDecision {
        if epoch != self.epoch || self.phase() != SessionPhase::Polling {
            return TickDecision::Stale;
        }
        if self.skip_next_tick {
            self.skip_next_tick = false;
            return TickDecision::Skip;
        }
        match self.next_fetch() {
            Some(ticket) => TickDecision::Fetch(ticket),
            None => TickDecision::Stale,
        }
    }

    /// Offer a fetched snapshot. It replaces the current one wholesale if it
    /// belongs to the current epoch, the session is still polling, and no
    /// later-initiated fetch has been applied already.
    pub fn apply_fetch(&mut self, epoch: Epoch, seq: FetchSeq, snapshot: MatchSnapshot) -> Applied {
        if epoch != self.epoch {
            return Applied::Discarded(DiscardReason::StaleEpoch);
        }
        if seq <= self.applied_seq {
            return Applied::Discarded(DiscardReason::OutOfOrder);
        }
        let Lifecycle::Polling(active) = &mut self.lifecycle else {
            return Applied::Discarded(DiscardReason::NotPolling);
        };
        if snapshot.match_id != active.match_id {
            return Applied::Discarded(DiscardReason::WrongMatch);
        }

        if active.opponent.is_none() {
            active.opponent = snapshot.opponent_of(&self.local).cloned();
        }
        let finished = snapshot.is_finished().then(|| snapshot.outcome());
        active.snapshot = Some(snapshot);
        self.applied_seq = seq;
        self.poll_failures = 0;

        match finished {
            Some(outcome) => {
                if let Lifecycle::Polling(active) =
                    std::mem::replace(&mut self.lifecycle, Lifecycle::Idle)
                {
                    self.lifecycle = Lifecycle::Finished(active);
                }
                self.skip_next_tick = false;
                Applied::Finished(outcome)
            }
            None => Applied::Updated,
        }
    }

    /// Record a failed fetch. Returns the length of the current failure
    /// streak, or `None` when the fetch belonged to an older epoch or the
    /// session stopped polling meanwhile.
    ///
    /// A failed fetch never stands in for a scheduled tick, so a pending
    /// post-play skip is cancelled.
    pub fn record_fetch_failure(&mut self, epoch: Epoch) -> Option<u32> {
        if epoch != self.epoch || self.phase() != SessionPhase::Polling {
            return None;
        }
        self.skip_next_tick = false;
        self.poll_failures += 1;
        Some(self.poll_failures)
    }

    /// The local, best-effort check before a play is sent.
    ///
    /// The turn is checked against the last known snapshot, which may be up
    /// to one poll interval old. The authority still has the final word.
    ///
    /// Refused in order: no polling match, not the local player's turn (also
    /// when no snapshot has arrived yet), a card id outside the deck, and a
    /// card missing from the hand in that snapshot. The last one surfaces as
    /// [`LocalRejection::CardNotInHand`] rather than the authority's own
    /// "Card not in hand" error. None of these reach the network.
    pub fn plan_play(&self, card_id: CardId) -> Result<PlayTicket, SessionError> {
        let active = match &self.lifecycle {
            Lifecycle::Polling(active) => active,
            Lifecycle::Finished(_) => return Err(LocalRejection::MatchAlreadyFinished.into()),
            Lifecycle::Idle | Lifecycle::Left => return Err(LocalRejection::NoActiveMatch.into()),
            Lifecycle::Creating { .. } | Lifecycle::Joining { .. } => {
                return Err(LocalRejection::InvalidTransition {
                    action: "play",
                    phase: self.phase(),
                }
                .into());
            }
        };

        let snapshot = match &active.snapshot {
            Some(snapshot) if snapshot.is_turn_of(&self.local) => snapshot,
            _ => return Err(LocalRejection::NotYourTurn.into()),
        };

        decode(card_id)?;
        if !snapshot.holds(card_id) {
            return Err(LocalRejection::CardNotInHand(card_id).into());
        }

        Ok(PlayTicket {
            epoch: self.epoch,
            match_id: active.match_id.clone(),
            as_player: self.local.clone(),
            card_id,
        })
    }

    /// The authority accepted a play. The out-of-band fetch that follows
    /// stands in for the next scheduled tick.
    pub fn play_accepted(&mut self, epoch: Epoch) {
        if epoch == self.epoch && self.phase() == SessionPhase::Polling {
            self.skip_next_tick = true;
        }
    }

    /// `Finished -> Left`. Returns whether anything changed; dismissing an
    /// already-closed session is a no-op.
    pub fn dismiss(&mut self) -> Result<bool, LocalRejection> {
        match self.lifecycle {
            Lifecycle::Finished(_) => {
                self.teardown();
                self.lifecycle = Lifecycle::Left;
                Ok(true)
            }
            Lifecycle::Idle | Lifecycle::Left => Ok(false),
            Lifecycle::Polling(_) => Err(LocalRejection::MatchStillActive),
            Lifecycle::Creating { .. } | Lifecycle::Joining { .. } => {
                Err(LocalRejection::InvalidTransition {
                    action: "dismiss",
                    phase: self.phase(),
                })
            }
        }
    }

    /// `Polling | Finished -> Left`. Returns whether a match was left.
    pub fn leave(&mut self) -> bool {
        if !self.phase().has_match() {
            return false;
        }
        self.teardown();
        self.lifecycle = Lifecycle::Left;
        true
    }

    /// Opponent for a rematch of the finished match.
    pub fn rematch_opponent(&self) -> Result<Username, LocalRejection> {
        match &self.lifecycle {
            Lifecycle::Finished(ActiveMatch {
                opponent: Some(opponent),
                ..
            }) => Ok(opponent.clone()),
            Lifecycle::Finished(_) | Lifecycle::Idle | Lifecycle::Left => {
                Err(LocalRejection::NoActiveMatch)
            }
            Lifecycle::Polling(_) => Err(LocalRejection::MatchStillActive),
            Lifecycle::Creating { .. } | Lifecycle::Joining { .. } => {
                Err(LocalRejection::InvalidTransition {
                    action: "rematch",
                    phase: self.phase(),
                })
            }
        }
    }

    fn adopt(&mut self, lifecycle: Lifecycle) -> Epoch {
        self.epoch += 1;
        self.lifecycle = lifecycle;
        self.skip_next_tick = false;
        self.poll_failures = 0;
        self.epoch
    }

    fn teardown(&mut self) {
        if self.phase().has_match() {
            self.epoch += 1;
        }
        self.lifecycle = Lifecycle::Idle;
        self.skip_next_tick = false;
        self.poll_failures = 0;
    }

    fn allocate_seq(&mut self) -> FetchSeq {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
