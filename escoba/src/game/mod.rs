//! Escoba domain values: the card codec, the authority's match snapshot and
//! the view the presentation layer renders.
//!
//! None of this encodes game rules. Capture logic, scoring and turn order
//! belong to the match authority and only show up here as reported values.

pub mod card;
pub mod snapshot;
pub mod view;

pub use card::{CardId, CardView, DECK_SIZE, DecodeError, Rank, Suit, decode, encode};
pub use snapshot::{MatchId, MatchOutcome, MatchSnapshot, MatchStatus, Username};
pub use view::{MatchView, ViewCard};
