//! Presentation-ready projection of a [`MatchSnapshot`].

use log::warn;
use serde::Serialize;
use std::fmt;

use super::{
    card::{CardId, CardView, decode},
    snapshot::{MatchId, MatchOutcome, MatchSnapshot, MatchStatus, Username},
};

/// A card slot as shown to the player. Ids the codec can't decode are kept
/// as-is instead of failing the whole view.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ViewCard {
    Known(CardView),
    Unreadable(CardId),
}

impl ViewCard {
    fn from_id(id: CardId) -> Self {
        match decode(id) {
            Ok(card) => Self::Known(card),
            Err(e) => {
                warn!("Authority reported an unreadable card: {e}");
                Self::Unreadable(id)
            }
        }
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        match self {
            Self::Known(card) => card.id,
            Self::Unreadable(id) => *id,
        }
    }
}

impl fmt::Display for ViewCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(card) => fmt::Display::fmt(card, f),
            Self::Unreadable(id) => write!(f, " ?{id}"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MatchView {
    pub match_id: MatchId,
    pub players: [Username; 2],
    pub current_player: Username,
    pub is_your_turn: bool,
    pub table: Vec<ViewCard>,
    pub hand: Vec<ViewCard>,
    pub captured: Vec<ViewCard>,
    pub score_line: String,
    pub status: MatchStatus,
    pub remaining_deck: Option<u32>,
    pub outcome: Option<MatchOutcome>,
    pub your_result: Option<String>,
}

impl MatchView {
    #[must_use]
    pub fn from_snapshot(snapshot: &MatchSnapshot, local: &Username) -> Self {
        Self {
            match_id: snapshot.match_id.clone(),
            players: snapshot.players.clone(),
            current_player: snapshot.current_player.clone(),
            is_your_turn: snapshot.is_turn_of(local),
            table: decode_all(&snapshot.table_cards),
            hand: decode_all(&snapshot.your_hand),
            captured: decode_all(&snapshot.captured_cards),
            score_line: snapshot.score_line(),
            status: snapshot.status,
            remaining_deck: snapshot.remaining_deck,
            outcome: snapshot.is_finished().then(|| snapshot.outcome()),
            your_result: snapshot.your_result.clone(),
        }
    }

    /// One-line description of whose move it is.
    #[must_use]
    pub fn turn_line(&self) -> String {
        if self.status == MatchStatus::Finished {
            "Match over".to_string()
        } else if self.is_your_turn {
            "It's your turn! Choose a card".to_string()
        } else {
            format!("Waiting for {}'s turn", self.current_player)
        }
    }
}

fn decode_all<'a>(ids: impl IntoIterator<Item = &'a CardId>) -> Vec<ViewCard> {
    ids.into_iter().map(|id| ViewCard::from_id(*id)).collect()
}
