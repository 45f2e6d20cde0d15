//! JSON bodies exchanged with the match authority.
//!
//! Every authority response follows one convention: a JSON object with an
//! `error` field is a failure, whatever the HTTP status says. Anything else
//! is parsed as the endpoint's success payload.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;

use super::errors::{TransportError, TransportResult};
use crate::game::{CardId, MatchId, Username};

#[derive(Debug, Serialize)]
pub struct CreateMatchRequest<'a> {
    pub player1: &'a Username,
    pub player2: &'a Username,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateMatchResponse {
    pub match_id: MatchId,
    #[serde(default)]
    pub players: Option<[Username; 2]>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayCardRequest<'a> {
    pub player: &'a Username,
    pub card_id: CardId,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayCardResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerProfile {
    #[serde(default)]
    pub player_id: Option<String>,
    pub username: Username,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub total_score: i64,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub matches_played: u32,
    #[serde(default)]
    pub matches_won: u32,
    #[serde(default)]
    pub matches_lost: u32,
    #[serde(default)]
    pub win_rate: f64,
}

fn default_level() -> u32 {
    1
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MatchHistory {
    pub username: Username,
    #[serde(default)]
    pub match_count: usize,
    #[serde(default)]
    pub matches: Vec<HistoryEntry>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub match_id: MatchId,
    pub player1: Username,
    pub player2: Username,
    #[serde(default)]
    pub winner: Option<Username>,
    #[serde(default)]
    pub scores: BTreeMap<Username, i64>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// `win`, `loss`, `draw` or whatever else the authority sends.
    #[serde(default)]
    pub your_result: Option<String>,
}

impl HistoryEntry {
    #[must_use]
    pub fn opponent_of(&self, username: &Username) -> &Username {
        if &self.player1 == username {
            &self.player2
        } else {
            &self.player1
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Turn a raw authority reply into a typed payload.
///
/// * A JSON object carrying `error` is a [`TransportError::Protocol`] with
///   the server's message, regardless of `status`.
/// * A non-success `status` without an `error` field is a
///   [`TransportError::Protocol`] naming the status.
/// * A body that doesn't parse as `T` is a [`TransportError::Network`].
///
/// # Examples
///
/// ```
/// use escoba::net::{errors::TransportError, messages::{PlayCardResponse, classify}};
///
/// let err = classify::<PlayCardResponse>(200, r#"{"error": "Not your turn"}"#).unwrap_err();
/// assert_eq!(err, TransportError::Protocol("Not your turn".to_string()));
/// ```
pub fn classify<T: DeserializeOwned>(status: u16, body: &str) -> TransportResult<T> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        TransportError::Network(format!("Malformed response body (HTTP {status}): {e}"))
    })?;

    if let Some(error) = value.get("error") {
        let message = match error {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(TransportError::Protocol(message));
    }

    if !(200..300).contains(&status) {
        return Err(TransportError::Protocol(format!(
            "Server answered with HTTP {status}"
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| TransportError::Network(format!("Unexpected response shape: {e}")))
}
