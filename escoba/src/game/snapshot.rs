//! Authoritative match state as reported by the match authority.

use serde::{Deserialize, Deserializer, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use super::card::CardId;

/// A participant identity. Surrounding whitespace is dropped, whether the
/// name was typed locally or reported by the authority; everything else is
/// compared verbatim.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

impl Username {
    pub fn new(s: &str) -> Self {
        Self(s.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque match identifier assigned by the authority.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    pub fn new(s: &str) -> Self {
        Self(s.trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for MatchId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MatchId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Finished,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Active => "in progress",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

/// How a finished match ended, derived from the reported scores.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum MatchOutcome {
    Winner(Username),
    Draw,
}

impl MatchOutcome {
    #[must_use]
    pub fn winner(&self) -> Option<&Username> {
        match self {
            Self::Winner(username) => Some(username),
            Self::Draw => None,
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Winner(username) => write!(f, "{username} won"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// The complete match state as seen by one player.
///
/// A snapshot is only ever replaced wholesale; nothing in the client merges
/// two snapshots or edits one in place.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchSnapshot {
    pub match_id: MatchId,
    pub players: [Username; 2],
    pub current_player: Username,
    #[serde(default)]
    pub table_cards: Vec<CardId>,
    #[serde(default)]
    pub your_hand: Vec<CardId>,
    #[serde(default)]
    pub captured_cards: BTreeSet<CardId>,
    #[serde(default)]
    pub scores: BTreeMap<Username, i64>,
    pub status: MatchStatus,
    #[serde(default)]
    pub remaining_deck: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    /// Result label attached by the authority for the viewing player.
    /// Carried through untouched.
    #[serde(default)]
    pub your_result: Option<String>,
}

impl MatchSnapshot {
    #[must_use]
    pub fn is_turn_of(&self, username: &Username) -> bool {
        &self.current_player == username
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    #[must_use]
    pub fn is_participant(&self, username: &Username) -> bool {
        self.players.contains(username)
    }

    /// The other of the two participants, if `username` is one of them.
    #[must_use]
    pub fn opponent_of(&self, username: &Username) -> Option<&Username> {
        match &self.players {
            [a, b] if a == username => Some(b),
            [a, b] if b == username => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn holds(&self, card: CardId) -> bool {
        self.your_hand.contains(&card)
    }

    #[must_use]
    pub fn score_of(&self, username: &Username) -> i64 {
        self.scores.get(username).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn outcome(&self) -> MatchOutcome {
        let [first, second] = &self.players;
        match self.score_of(first).cmp(&self.score_of(second)) {
            std::cmp::Ordering::Greater => MatchOutcome::Winner(first.clone()),
            std::cmp::Ordering::Less => MatchOutcome::Winner(second.clone()),
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        }
    }

    /// Scores in participant order, e.g. `"alice: 3 | bob: 1"`.
    #[must_use]
    pub fn score_line(&self) -> String {
        self.players
            .iter()
            .map(|player| format!("{player}: {}", self.score_of(player)))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE_JSON: &str = r#"{
        "match_id": "m1",
        "players": ["alice", "bob"],
        "current_player": "alice",
        "status": "active",
        "table_cards": [3, 14, 25, 40],
        "your_hand": [5, 18, 33],
        "scores": {"alice": 0, "bob": 0},
        "message": "Game state for alice"
    }"#;

    fn snapshot() -> MatchSnapshot {
        serde_json::from_str(STATE_JSON).unwrap()
    }

    #[test]
    fn test_deserialize_authority_state() {
        let snapshot = snapshot();
        assert_eq!(snapshot.match_id, MatchId::new("m1"));
        assert_eq!(snapshot.players, [Username::new("alice"), Username::new("bob")]);
        assert_eq!(snapshot.status, MatchStatus::Active);
        assert_eq!(snapshot.table_cards, vec![3, 14, 25, 40]);
        assert!(snapshot.captured_cards.is_empty());
        assert_eq!(snapshot.remaining_deck, None);
        assert_eq!(snapshot.your_result, None);
    }

    #[test]
    fn test_reported_names_are_normalised_like_local_ones() {
        let snapshot: MatchSnapshot = serde_json::from_str(
            r#"{"match_id": "m1", "players": [" alice", "bob "], "current_player": "alice ",
                "status": "active", "scores": {" alice": 4}}"#,
        )
        .unwrap();
        let alice = Username::new("alice");
        assert!(snapshot.is_turn_of(&alice));
        assert_eq!(snapshot.opponent_of(&alice), Some(&Username::new("bob")));
        assert_eq!(snapshot.score_of(&alice), 4);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let json = STATE_JSON.replace("\"active\"", "\"paused\"");
        assert!(serde_json::from_str::<MatchSnapshot>(&json).is_err());
    }

    #[test]
    fn test_turn_and_opponent() {
        let snapshot = snapshot();
        let alice = Username::new("alice");
        let bob = Username::new("bob");
        assert!(snapshot.is_turn_of(&alice));
        assert!(!snapshot.is_turn_of(&bob));
        assert_eq!(snapshot.opponent_of(&alice), Some(&bob));
        assert_eq!(snapshot.opponent_of(&bob), Some(&alice));
        assert_eq!(snapshot.opponent_of(&Username::new("carol")), None);
    }

    #[test]
    fn test_holds() {
        let snapshot = snapshot();
        assert!(snapshot.holds(5));
        assert!(!snapshot.holds(3));
    }

    #[test]
    fn test_outcome() {
        let mut snapshot = snapshot();
        assert_eq!(snapshot.outcome(), MatchOutcome::Draw);

        snapshot.scores.insert(Username::new("bob"), 4);
        assert_eq!(snapshot.outcome(), MatchOutcome::Winner(Username::new("bob")));

        snapshot.scores.insert(Username::new("alice"), 6);
        assert_eq!(snapshot.outcome(), MatchOutcome::Winner(Username::new("alice")));
    }

    #[test]
    fn test_missing_score_counts_as_zero() {
        let mut snapshot = snapshot();
        snapshot.scores.clear();
        snapshot.scores.insert(Username::new("alice"), 1);
        assert_eq!(snapshot.outcome(), MatchOutcome::Winner(Username::new("alice")));
        assert_eq!(snapshot.score_line(), "alice: 1 | bob: 0");
    }

    #[test]
    fn test_username_is_verbatim_apart_from_trim() {
        assert_eq!(Username::new("  alice "), Username::new("alice"));
        assert_ne!(Username::new("Alice"), Username::new("alice"));
        assert_eq!(Username::new("a b").as_str(), "a b");
    }
}
