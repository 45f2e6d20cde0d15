//! The contract the session needs from the match authority.

use async_trait::async_trait;

use super::{errors::TransportResult, messages::CreateMatchResponse};
use crate::game::{CardId, MatchId, MatchSnapshot, Username};

/// One method per authority capability.
///
/// Each call is exactly one round trip. Implementations never retry;
/// whether a failed call is repeated is the session's decision.
#[async_trait]
pub trait MatchTransport: Send + Sync {
    /// Ask the authority to open a match between two players.
    async fn create_match(
        &self,
        player1: &Username,
        player2: &Username,
    ) -> TransportResult<CreateMatchResponse>;

    /// Fetch the match state as seen by `as_player`.
    async fn fetch_state(
        &self,
        match_id: &MatchId,
        as_player: &Username,
    ) -> TransportResult<MatchSnapshot>;

    /// Play a card from `as_player`'s hand. Returns the authority's
    /// acknowledgement message, if any.
    async fn play_card(
        &self,
        match_id: &MatchId,
        as_player: &Username,
        card_id: CardId,
    ) -> TransportResult<Option<String>>;
}
