//! Golf rules as a pure state machine.
//!
//! Every operation validates the whole action against the current state
//! before touching it, so a rejected action leaves the state (version
//! included) exactly as it was. Successful operations bump `version` by one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

use super::entities::{Card, DECK_SIZE, Deck, GameId, HAND_SIZE, NUM_PLAYERS, PlayerId, ROW_SIZE};
use super::scoring::hand_score;

/// Flips each player makes before the main game starts.
pub const INITIAL_FLIPS: u8 = 2;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InitialFlip,
    MainGame,
    FinalRound,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::InitialFlip => "initial_flip",
            Self::MainGame => "main_game",
            Self::FinalRound => "final_round",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

/// Rule violations. None of these are retried; the offending action is
/// simply rejected.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GameError {
    #[error("action not allowed during {0}")]
    WrongPhase(Phase),
    #[error("not your turn")]
    NotYourTurn,
    #[error("card index {0} out of range")]
    InvalidCardIndex(usize),
    #[error("card is already face up")]
    CardAlreadyFaceUp,
    #[error("second initial flip must be in the other row")]
    InvalidInitialFlip,
    #[error("already flipped 2 cards")]
    InitialFlipsExhausted,
    #[error("no card has been drawn")]
    NoDrawnCard,
    #[error("a card has already been drawn this turn")]
    CardAlreadyDrawn,
    #[error("deck is empty")]
    EmptyDeck,
    #[error("discard pile is empty")]
    EmptyDiscard,
    #[error("player not found")]
    PlayerNotFound,
    #[error("golf needs exactly 2 players, got {0}")]
    InvalidPlayerCount(usize),
    #[error("game is not finished")]
    GameNotFinished,
    #[error("game result already recorded")]
    AlreadyFinalized,
}

/// Actions a player can request. This is the engine-facing form of the
/// wire-level `action` message.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    InitialFlip { index: usize },
    DrawDeck,
    DrawDiscard,
    SwapCard { index: usize },
    DiscardFlip { index: usize },
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitialFlip { index } => write!(f, "initial_flip({index})"),
            Self::DrawDeck => write!(f, "draw_deck"),
            Self::DrawDiscard => write!(f, "draw_discard"),
            Self::SwapCard { index } => write!(f, "swap_card({index})"),
            Self::DiscardFlip { index } => write!(f, "discard_flip({index})"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub player_id: PlayerId,
    pub hand: [Card; HAND_SIZE],
    pub face_up: [bool; HAND_SIZE],
    pub initial_flips: u8,
    /// Cached `face_up.iter().all(..)`; refreshed on every hand change.
    pub all_flipped: bool,
}

impl PlayerState {
    #[must_use]
    pub fn new(player_id: PlayerId, hand: [Card; HAND_SIZE]) -> Self {
        Self {
            player_id,
            hand,
            face_up: [false; HAND_SIZE],
            initial_flips: 0,
            all_flipped: false,
        }
    }

    /// Score from the cards currently showing.
    #[must_use]
    pub fn visible_score(&self) -> i32 {
        hand_score(&self.hand, &self.face_up)
    }

    fn refresh_all_flipped(&mut self) {
        self.all_flipped = self.face_up.iter().all(|up| *up);
    }

    fn reveal_all(&mut self) {
        self.face_up = [true; HAND_SIZE];
        self.all_flipped = true;
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "playerId", rename_all = "snake_case")]
pub enum GameOutcome {
    Winner(PlayerId),
    Draw,
}

/// Terminal result, written once by [`GameState::finish_game`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub scores: BTreeMap<PlayerId, i32>,
    pub outcome: GameOutcome,
    pub finished_at: DateTime<Utc>,
}

impl GameResult {
    pub fn winner(&self) -> Option<&PlayerId> {
        match &self.outcome {
            GameOutcome::Winner(player_id) => Some(player_id),
            GameOutcome::Draw => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.outcome == GameOutcome::Draw
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub game_id: GameId,
    pub phase: Phase,
    pub deck: Deck,
    /// Last element is the visible top card.
    pub discard_pile: Vec<Card>,
    /// Seat order is turn order.
    pub players: Vec<PlayerState>,
    pub current_turn: usize,
    pub drawn_card: Option<Card>,
    pub final_round_trigger: Option<usize>,
    pub final_round_turns_remaining: i32,
    pub version: i64,
    pub result: Option<GameResult>,
}

impl GameState {
    /// Deals a new game from a freshly shuffled deck.
    pub fn initialize(game_id: GameId, players: Vec<PlayerId>) -> Result<Self, GameError> {
        Self::with_deck(game_id, players, Deck::shuffled())
    }

    /// Deals a new game from `deck` as given: six cards per player in seat
    /// order from the front, then one card to start the discard pile.
    pub fn with_deck(
        game_id: GameId,
        players: Vec<PlayerId>,
        mut deck: Deck,
    ) -> Result<Self, GameError> {
        if players.len() != NUM_PLAYERS {
            return Err(GameError::InvalidPlayerCount(players.len()));
        }
        if deck.len() < NUM_PLAYERS * HAND_SIZE + 1 {
            return Err(GameError::EmptyDeck);
        }

        let mut seats = Vec::with_capacity(NUM_PLAYERS);
        for player_id in players {
            let mut dealt = Vec::with_capacity(HAND_SIZE);
            while dealt.len() < HAND_SIZE {
                dealt.push(deck.draw().ok_or(GameError::EmptyDeck)?);
            }
            let hand: [Card; HAND_SIZE] = dealt
                .try_into()
                .map_err(|_: Vec<Card>| GameError::EmptyDeck)?;
            seats.push(PlayerState::new(player_id, hand));
        }
        let first_discard = deck.draw().ok_or(GameError::EmptyDeck)?;

        Ok(Self {
            game_id,
            phase: Phase::InitialFlip,
            deck,
            discard_pile: vec![first_discard],
            players: seats,
            current_turn: 0,
            drawn_card: None,
            final_round_trigger: None,
            final_round_turns_remaining: 0,
            version: 1,
            result: None,
        })
    }

    pub fn seat_of(&self, player_id: &PlayerId) -> Result<usize, GameError> {
        self.players
            .iter()
            .position(|p| &p.player_id == player_id)
            .ok_or(GameError::PlayerNotFound)
    }

    pub fn current_player(&self) -> Option<&PlayerState> {
        self.players.get(self.current_turn)
    }

    pub fn discard_top(&self) -> Option<&Card> {
        self.discard_pile.last()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Every card the game accounts for. Always equal to [`DECK_SIZE`] for a
    /// game dealt from a full deck.
    pub fn card_count(&self) -> usize {
        self.deck.len()
            + self.discard_pile.len()
            + self.players.iter().map(|p| p.hand.len()).sum::<usize>()
            + usize::from(self.drawn_card.is_some())
    }

    pub fn is_conserved(&self) -> bool {
        self.card_count() == DECK_SIZE
    }

    /// Routes a wire-level action to the matching operation.
    pub fn apply(&mut self, player_id: &PlayerId, action: PlayerAction) -> Result<(), GameError> {
        match action {
            PlayerAction::InitialFlip { index } => self.flip_initial_card(player_id, index),
            PlayerAction::DrawDeck => self.draw_from_deck(player_id),
            PlayerAction::DrawDiscard => self.draw_from_discard(player_id),
            PlayerAction::SwapCard { index } => self.swap_card(player_id, index),
            PlayerAction::DiscardFlip { index } => self.discard_and_flip(player_id, index),
        }
    }

    /// Flips one of the player's own cards before the main game. Not turn
    /// ordered. The second flip has to land in the row opposite the first.
    pub fn flip_initial_card(&mut self, player_id: &PlayerId, index: usize) -> Result<(), GameError> {
        if self.phase != Phase::InitialFlip {
            return Err(GameError::WrongPhase(self.phase));
        }
        let seat = self.seat_of(player_id)?;
        check_index(index)?;

        let player = &self.players[seat];
        if player.initial_flips >= INITIAL_FLIPS {
            return Err(GameError::InitialFlipsExhausted);
        }
        if player.face_up[index] {
            return Err(GameError::CardAlreadyFaceUp);
        }
        if player.initial_flips == 1 {
            let first = player
                .face_up
                .iter()
                .position(|up| *up)
                .ok_or(GameError::InvalidInitialFlip)?;
            if row_of(first) == row_of(index) {
                return Err(GameError::InvalidInitialFlip);
            }
        }

        let player = &mut self.players[seat];
        player.face_up[index] = true;
        player.initial_flips += 1;
        player.refresh_all_flipped();

        if self
            .players
            .iter()
            .all(|p| p.initial_flips >= INITIAL_FLIPS)
        {
            self.phase = Phase::MainGame;
            self.current_turn = 0;
        }
        self.version += 1;
        Ok(())
    }

    pub fn draw_from_deck(&mut self, player_id: &PlayerId) -> Result<(), GameError> {
        self.check_can_draw(player_id)?;
        let card = self.deck.draw().ok_or(GameError::EmptyDeck)?;
        self.drawn_card = Some(card);
        self.version += 1;
        Ok(())
    }

    pub fn draw_from_discard(&mut self, player_id: &PlayerId) -> Result<(), GameError> {
        self.check_can_draw(player_id)?;
        let card = self.discard_pile.pop().ok_or(GameError::EmptyDiscard)?;
        self.drawn_card = Some(card);
        self.version += 1;
        Ok(())
    }

    /// Puts the drawn card into `index`; the replaced card goes face up on
    /// the discard pile. Ends the turn.
    pub fn swap_card(&mut self, player_id: &PlayerId, index: usize) -> Result<(), GameError> {
        let seat = self.check_holding_drawn(player_id, index)?;
        let drawn = self.drawn_card.take().ok_or(GameError::NoDrawnCard)?;

        let player = &mut self.players[seat];
        let replaced = std::mem::replace(&mut player.hand[index], drawn);
        player.face_up[index] = true;
        player.refresh_all_flipped();
        self.discard_pile.push(replaced);

        self.end_turn(seat);
        self.version += 1;
        Ok(())
    }

    /// Discards the drawn card and turns a face-down card up instead. Ends
    /// the turn.
    pub fn discard_and_flip(&mut self, player_id: &PlayerId, index: usize) -> Result<(), GameError> {
        let seat = self.check_holding_drawn(player_id, index)?;
        if self.players[seat].face_up[index] {
            return Err(GameError::CardAlreadyFaceUp);
        }
        let drawn = self.drawn_card.take().ok_or(GameError::NoDrawnCard)?;

        self.discard_pile.push(drawn);
        let player = &mut self.players[seat];
        player.face_up[index] = true;
        player.refresh_all_flipped();

        self.end_turn(seat);
        self.version += 1;
        Ok(())
    }

    /// Reveals every card, scores the hands and records the result. Only
    /// valid once the game reached [`Phase::Finished`], and only once.
    pub fn finish_game(&mut self) -> Result<GameResult, GameError> {
        self.finish_game_at(Utc::now())
    }

    pub fn finish_game_at(&mut self, finished_at: DateTime<Utc>) -> Result<GameResult, GameError> {
        if self.phase != Phase::Finished {
            return Err(GameError::GameNotFinished);
        }
        if self.result.is_some() {
            return Err(GameError::AlreadyFinalized);
        }

        for player in &mut self.players {
            player.reveal_all();
        }
        let scores = self.final_scores();

        let best = scores.values().copied().min().unwrap_or_default();
        let mut leaders = scores.iter().filter(|(_, score)| **score == best);
        let outcome = match (leaders.next(), leaders.next()) {
            (Some((player_id, _)), None) => GameOutcome::Winner(player_id.clone()),
            _ => GameOutcome::Draw,
        };

        let result = GameResult {
            scores,
            outcome,
            finished_at,
        };
        self.result = Some(result.clone());
        self.version += 1;
        Ok(result)
    }

    /// Scores of every player from the cards currently face up.
    pub fn final_scores(&self) -> BTreeMap<PlayerId, i32> {
        self.players
            .iter()
            .map(|p| (p.player_id.clone(), p.visible_score()))
            .collect()
    }

    fn check_can_draw(&self, player_id: &PlayerId) -> Result<usize, GameError> {
        let seat = self.check_turn(player_id)?;
        if self.drawn_card.is_some() {
            return Err(GameError::CardAlreadyDrawn);
        }
        Ok(seat)
    }

    fn check_holding_drawn(&self, player_id: &PlayerId, index: usize) -> Result<usize, GameError> {
        let seat = self.check_turn(player_id)?;
        check_index(index)?;
        if self.drawn_card.is_none() {
            return Err(GameError::NoDrawnCard);
        }
        Ok(seat)
    }

    fn check_turn(&self, player_id: &PlayerId) -> Result<usize, GameError> {
        if !matches!(self.phase, Phase::MainGame | Phase::FinalRound) {
            return Err(GameError::WrongPhase(self.phase));
        }
        let seat = self.seat_of(player_id)?;
        if seat != self.current_turn {
            return Err(GameError::NotYourTurn);
        }
        Ok(seat)
    }

    /// Closes the acting player's turn. The player who first turns their
    /// whole hand up starts the final round; everyone else then gets exactly
    /// one more turn.
    fn end_turn(&mut self, seat: usize) {
        let num_players = self.players.len();
        match self.phase {
            Phase::MainGame if self.players[seat].all_flipped => {
                self.phase = Phase::FinalRound;
                self.final_round_trigger = Some(seat);
                self.final_round_turns_remaining = num_players as i32 - 1;
            }
            Phase::FinalRound => {
                self.final_round_turns_remaining -= 1;
            }
            _ => {}
        }

        if self.phase == Phase::FinalRound && self.final_round_turns_remaining <= 0 {
            self.phase = Phase::Finished;
            self.final_round_turns_remaining = 0;
            for player in &mut self.players {
                player.reveal_all();
            }
        }

        self.current_turn = (self.current_turn + 1) % num_players;
    }
}

fn check_index(index: usize) -> Result<(), GameError> {
    if index >= HAND_SIZE {
        return Err(GameError::InvalidCardIndex(index));
    }
    Ok(())
}

const fn row_of(index: usize) -> usize {
    index / ROW_SIZE
}
