//! # Escoba
//!
//! Client-side core for playing Escoba, the Spanish 40-card game, against a
//! remote match authority that owns every rule.
//!
//! The client never decides whether a move is legal, what it scores or how
//! the deck is shuffled. It shows the state the authority reports and
//! forwards the player's intents: create a match, join one, play a card.
//!
//! ## Core Modules
//!
//! - [`game`]: card codec, match snapshot and the presentation view
//! - [`net`]: transport contract and wire messages of the match authority
//! - [`session`]: match lifecycle state machine, poll scheduler and the actor
//!   that serialises both
//!
//! ## Example
//!
//! ```
//! use escoba::game::{decode, Suit};
//!
//! let card = decode(38).unwrap();
//! assert_eq!(card.suit, Suit::Clubs);
//! assert_eq!(card.full_name, "Jack of Clubs");
//! ```

/// Card codec and match state.
pub mod game;
pub use game::{CardId, CardView, DecodeError, MatchId, MatchSnapshot, MatchView, Username, decode};

/// Transport contract and wire messages.
pub mod net;
pub use net::{
    errors::{TransportError, TransportResult},
    transport::MatchTransport,
};

/// Match lifecycle and synchronisation.
pub mod session;
pub use session::{
    SessionActor, SessionConfig, SessionError, SessionHandle, SessionPhase, SessionUpdate,
};
