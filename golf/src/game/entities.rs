use rand::{CryptoRng, Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};

/// Cards dealt to each player (a 3x2 grid).
pub const HAND_SIZE: usize = 6;

/// Cards per row of the grid. Indices `0..3` are the top row, `3..6` the bottom.
pub const ROW_SIZE: usize = 3;

/// A full deck: 52 standard cards plus two jokers.
pub const DECK_SIZE: usize = 54;

/// Golf is strictly head-to-head.
pub const NUM_PLAYERS: usize = 2;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
    Joker,
}

impl Suit {
    pub const STANDARD: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Hearts => "♥",
            Self::Diamonds => "♦",
            Self::Clubs => "♣",
            Self::Spades => "♠",
            Self::Joker => "*",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    Joker,
}

impl Rank {
    /// Ranks of the four standard suits, ace first.
    pub const STANDARD: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Ace => "A",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Joker => "Joker",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    #[must_use]
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { suit, rank }
    }

    #[must_use]
    pub const fn joker() -> Self {
        Self {
            suit: Suit::Joker,
            rank: Rank::Joker,
        }
    }

    pub fn is_joker(&self) -> bool {
        self.rank == Rank::Joker
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_joker() {
            return write!(f, "{:>5}", "Joker");
        }
        let repr = format!("{}/{}", self.rank, self.suit);
        write!(f, "{repr:>5}")
    }
}

/// Draw pile. The front of the deck is the next card drawn.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Deck {
    cards: VecDeque<Card>,
}

impl Deck {
    /// The 54 cards in suit-then-rank order with both jokers at the back.
    #[must_use]
    pub fn standard() -> Self {
        let mut cards = VecDeque::with_capacity(DECK_SIZE);
        for suit in Suit::STANDARD {
            for rank in Rank::STANDARD {
                cards.push_back(Card::new(rank, suit));
            }
        }
        cards.push_back(Card::joker());
        cards.push_back(Card::joker());
        Self { cards }
    }

    /// A freshly shuffled deck using an OS-seeded cryptographic generator.
    #[must_use]
    pub fn shuffled() -> Self {
        let mut rng = StdRng::from_os_rng();
        Self::shuffled_with(&mut rng)
    }

    #[must_use]
    pub fn shuffled_with<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        let mut deck = Self::standard();
        deck.shuffle(rng);
        deck
    }

    /// Builds a deck in exactly the given order. Used for replays and tests.
    #[must_use]
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self {
            cards: cards.into(),
        }
    }

    /// Fisher-Yates: walk from the back, swapping each slot with a uniformly
    /// chosen slot at or before it.
    pub fn shuffle<R: Rng + CryptoRng>(&mut self, rng: &mut R) {
        let cards = self.cards.make_contiguous();
        for i in (1..cards.len()).rev() {
            let j = rng.random_range(0..=i);
            cards.swap(i, j);
        }
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop_front()
    }

    pub fn peek(&self) -> Option<&Card> {
        self.cards.front()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::standard()
    }
}

/// Builds and shuffles a full 54-card deck.
#[must_use]
pub fn build_shuffled_deck() -> Deck {
    Deck::shuffled()
}

/// Stable identifier of a user taking part in a game.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Public identifier of a game. Rooms and persisted state are keyed by it.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for GameId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for GameId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_standard_deck_has_54_cards() {
        let deck = Deck::standard();
        assert_eq!(deck.len(), DECK_SIZE);
        assert_eq!(deck.iter().filter(|c| c.is_joker()).count(), 2);
    }

    #[test]
    fn test_shuffled_deck_contains_every_card_once() {
        let deck = Deck::shuffled();
        let mut counts: HashMap<Card, usize> = HashMap::new();
        for card in deck.iter() {
            *counts.entry(*card).or_default() += 1;
        }

        assert_eq!(deck.len(), DECK_SIZE);
        // 52 distinct standard cards plus one joker entry seen twice
        assert_eq!(counts.len(), 53);
        assert_eq!(counts[&Card::joker()], 2);
        assert!(counts.iter().all(|(card, n)| card.is_joker() || *n == 1));
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let a = Deck::shuffled_with(&mut StdRng::seed_from_u64(7));
        let b = Deck::shuffled_with(&mut StdRng::seed_from_u64(7));
        let c = Deck::shuffled_with(&mut StdRng::seed_from_u64(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_shuffle_moves_cards() {
        let deck = Deck::shuffled_with(&mut StdRng::seed_from_u64(42));
        assert_ne!(deck, Deck::standard());
    }

    #[test]
    fn test_first_position_is_roughly_uniform() {
        // 54 * 200 draws; every card should lead at least once with overwhelming probability
        let mut rng = StdRng::seed_from_u64(1234);
        let mut leaders: HashMap<Card, usize> = HashMap::new();
        for _ in 0..(DECK_SIZE * 200) {
            let deck = Deck::shuffled_with(&mut rng);
            *leaders.entry(*deck.peek().unwrap()).or_default() += 1;
        }
        assert_eq!(leaders.len(), 53);
        let jokers = leaders[&Card::joker()];
        let ace_of_spades = leaders[&Card::new(Rank::Ace, Suit::Spades)];
        // Two jokers lead about twice as often as any single card
        assert!(jokers > ace_of_spades);
    }

    #[test]
    fn test_draw_takes_from_front() {
        let mut deck = Deck::from_cards(vec![
            Card::new(Rank::Ace, Suit::Hearts),
            Card::new(Rank::King, Suit::Spades),
        ]);
        assert_eq!(deck.draw(), Some(Card::new(Rank::Ace, Suit::Hearts)));
        assert_eq!(deck.draw(), Some(Card::new(Rank::King, Suit::Spades)));
        assert_eq!(deck.draw(), None);
        assert!(deck.is_empty());
    }

    #[test]
    fn test_card_json_shape() {
        let json = serde_json::to_string(&Card::new(Rank::Ten, Suit::Clubs)).unwrap();
        assert_eq!(json, r#"{"suit":"clubs","rank":"10"}"#);

        let joker: Card = serde_json::from_str(r#"{"suit":"joker","rank":"Joker"}"#).unwrap();
        assert!(joker.is_joker());
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card::new(Rank::Queen, Suit::Hearts).to_string(), "  Q/♥");
        assert_eq!(Card::joker().to_string(), "Joker");
    }
}
