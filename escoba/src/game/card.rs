//! Spanish 40-card deck codec.
//!
//! Card identifiers are integers in `1..=40`, laid out suit by suit:
//! golds `1..=10`, cups `11..=20`, swords `21..=30`, clubs `31..=40`.
//! Within a suit, ranks 1-7 are numeric and 8, 9, 10 are the jack (sota),
//! knight (caballo) and king (rey).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Integer card identifier as reported by the match authority.
pub type CardId = i32;

/// Number of cards in a Spanish deck.
pub const DECK_SIZE: CardId = 40;

/// Cards per suit.
const SUIT_SIZE: CardId = 10;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum DecodeError {
    #[error("card id {0} is outside 1..={DECK_SIZE}")]
    OutOfRange(CardId),
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Golds,
    Cups,
    Swords,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Golds, Suit::Cups, Suit::Swords, Suit::Clubs];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Golds => 0,
            Self::Cups => 1,
            Self::Swords => 2,
            Self::Clubs => 3,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Golds => "♦",
            Self::Cups => "♥",
            Self::Swords => "♠",
            Self::Clubs => "♣",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Golds => "Golds",
            Self::Cups => "Cups",
            Self::Swords => "Swords",
            Self::Clubs => "Clubs",
        }
    }

    /// Suit name used by the card artwork file names.
    #[must_use]
    pub const fn asset_name(self) -> &'static str {
        match self {
            Self::Golds => "oros",
            Self::Cups => "copas",
            Self::Swords => "espadas",
            Self::Clubs => "bastos",
        }
    }

    /// Golds and cups are printed in red.
    #[must_use]
    pub const fn is_red(self) -> bool {
        matches!(self, Self::Golds | Self::Cups)
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Rank within a suit, always in `1..=10`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Rank(u8);

impl Rank {
    pub const JACK: Rank = Rank(8);
    pub const KNIGHT: Rank = Rank(9);
    pub const KING: Rank = Rank(10);

    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (1..=10).contains(&value).then_some(Self(value))
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_face(self) -> bool {
        self.0 >= 8
    }

    /// Compact label for narrow displays.
    #[must_use]
    pub fn short_label(self) -> String {
        match self.0 {
            8 => "J".to_string(),
            9 => "K".to_string(),
            10 => "R".to_string(),
            n => n.to_string(),
        }
    }

    #[must_use]
    pub fn long_label(self) -> String {
        match self.0 {
            8 => "Jack".to_string(),
            9 => "Knight".to_string(),
            10 => "King".to_string(),
            n => n.to_string(),
        }
    }

    fn asset_stem(self) -> String {
        match self.0 {
            8 => "sota".to_string(),
            9 => "caballo".to_string(),
            10 => "rey".to_string(),
            n => n.to_string(),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.long_label())
    }
}

/// Everything the presentation layer needs to draw one card.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct CardView {
    pub id: CardId,
    pub suit: Suit,
    pub rank: Rank,
    pub symbol: &'static str,
    pub suit_name: &'static str,
    pub label: String,
    pub is_red: bool,
    pub full_name: String,
    pub asset: String,
}

impl fmt::Display for CardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = format!("{}{}", self.rank.short_label(), self.symbol);
        write!(f, "{repr:>3}")
    }
}

/// Decode a card id into its suit, rank and display attributes.
///
/// Pure and total over `1..=40`; anything else is rejected with
/// [`DecodeError::OutOfRange`].
///
/// # Examples
///
/// ```
/// use escoba::game::card::{decode, Suit};
///
/// let card = decode(18).unwrap();
/// assert_eq!(card.suit, Suit::Cups);
/// assert_eq!(card.label, "Jack");
/// assert_eq!(card.asset, "sota_copas.png");
/// assert!(decode(41).is_err());
/// ```
pub fn decode(id: CardId) -> Result<CardView, DecodeError> {
    if !(1..=DECK_SIZE).contains(&id) {
        return Err(DecodeError::OutOfRange(id));
    }

    let suit = Suit::ALL[((id - 1) / SUIT_SIZE) as usize];
    let rank = Rank((((id - 1) % SUIT_SIZE) + 1) as u8);

    Ok(CardView {
        id,
        suit,
        rank,
        symbol: suit.symbol(),
        suit_name: suit.name(),
        label: rank.long_label(),
        is_red: suit.is_red(),
        full_name: format!("{} of {}", rank.long_label(), suit.name()),
        asset: format!("{}_{}.png", rank.asset_stem(), suit.asset_name()),
    })
}

/// Inverse of [`decode`].
#[must_use]
pub fn encode(suit: Suit, rank: Rank) -> CardId {
    suit.index() as CardId * SUIT_SIZE + CardId::from(rank.value())
}

/// All 40 cards in id order.
pub fn deck() -> impl Iterator<Item = CardView> {
    (1..=DECK_SIZE).filter_map(|id| decode(id).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_card_is_one_of_golds() {
        let card = decode(1).unwrap();
        assert_eq!(card.suit, Suit::Golds);
        assert_eq!(card.rank.value(), 1);
        assert_eq!(card.label, "1");
        assert_eq!(card.full_name, "1 of Golds");
        assert_eq!(card.asset, "1_oros.png");
        assert!(card.is_red);
    }

    #[test]
    fn test_jacks_in_every_suit() {
        for (id, suit) in [(8, Suit::Golds), (18, Suit::Cups), (28, Suit::Swords), (38, Suit::Clubs)] {
            let card = decode(id).unwrap();
            assert_eq!(card.suit, suit);
            assert_eq!(card.rank, Rank::JACK);
            assert_eq!(card.label, "Jack");
            assert_eq!(card.rank.short_label(), "J");
        }
    }

    #[test]
    fn test_face_card_assets() {
        assert_eq!(decode(9).unwrap().asset, "caballo_oros.png");
        assert_eq!(decode(30).unwrap().asset, "rey_espadas.png");
        assert_eq!(decode(38).unwrap().asset, "sota_bastos.png");
        assert_eq!(decode(40).unwrap().full_name, "King of Clubs");
    }

    #[test]
    fn test_black_suits() {
        assert!(!decode(21).unwrap().is_red);
        assert!(!decode(40).unwrap().is_red);
        assert!(decode(20).unwrap().is_red);
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(decode(0), Err(DecodeError::OutOfRange(0)));
        assert_eq!(decode(41), Err(DecodeError::OutOfRange(41)));
        assert_eq!(decode(-7), Err(DecodeError::OutOfRange(-7)));
    }

    #[test]
    fn test_encode_inverts_decode() {
        for card in deck() {
            assert_eq!(encode(card.suit, card.rank), card.id);
        }
        assert_eq!(deck().count(), 40);
    }

    #[test]
    fn test_rank_bounds() {
        assert!(Rank::new(0).is_none());
        assert!(Rank::new(11).is_none());
        assert!(Rank::new(10).unwrap().is_face());
        assert!(!Rank::new(7).unwrap().is_face());
    }

    #[test]
    fn test_card_display() {
        assert_eq!(decode(1).unwrap().to_string(), " 1♦");
        assert_eq!(decode(40).unwrap().to_string(), " R♣");
    }
}
