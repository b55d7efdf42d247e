//! Golf game engine: cards, scoring, the rules state machine and the
//! per-viewer projection sent to clients.

pub mod entities;
pub mod scoring;
pub mod state_machine;
pub mod view;

pub use entities::{Card, Deck, GameId, PlayerId, Rank, Suit, build_shuffled_deck};
pub use scoring::{card_value, column_score, hand_score};
pub use state_machine::{
    GameError, GameOutcome, GameResult, GameState, Phase, PlayerAction, PlayerState,
};
pub use view::{GameView, PlayerView, SlotView};
