//! Per-viewer projections of a [`GameState`].
//!
//! A view is rebuilt for each recipient on every broadcast. Opponent cards
//! that are face down never leave the server, and neither does a drawn card
//! held by someone else.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::entities::{Card, GameId, PlayerId};
use super::state_machine::{GameResult, GameState, Phase, PlayerState};

/// One grid position. `card` is `None` when the viewer may not see it.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub card: Option<Card>,
    pub face_up: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub display_name: String,
    pub seat: usize,
    pub is_you: bool,
    pub slots: Vec<SlotView>,
    pub initial_flips: u8,
    pub all_flipped: bool,
    pub visible_score: i32,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub game_id: GameId,
    pub phase: Phase,
    pub version: i64,
    pub you: PlayerId,
    pub current_turn: usize,
    pub current_player_id: Option<PlayerId>,
    pub deck_count: usize,
    pub discard_top: Option<Card>,
    pub discard_count: usize,
    /// Only populated for the player holding it.
    pub drawn_card: Option<Card>,
    pub has_drawn_card: bool,
    pub final_round_trigger: Option<PlayerId>,
    pub final_round_turns_remaining: i32,
    pub players: Vec<PlayerView>,
    pub result: Option<GameResult>,
}

impl GameView {
    /// Builds what `viewer` is allowed to see. `display_names` falls back to
    /// the player id for anyone missing from it.
    #[must_use]
    pub fn for_viewer(
        state: &GameState,
        viewer: &PlayerId,
        display_names: &HashMap<PlayerId, String>,
    ) -> Self {
        let holder = state
            .drawn_card
            .and_then(|_| state.current_player())
            .map(|p| &p.player_id);

        let players = state
            .players
            .iter()
            .enumerate()
            .map(|(seat, player)| project_player(seat, player, viewer, display_names))
            .collect();

        Self {
            game_id: state.game_id.clone(),
            phase: state.phase,
            version: state.version,
            you: viewer.clone(),
            current_turn: state.current_turn,
            current_player_id: state.current_player().map(|p| p.player_id.clone()),
            deck_count: state.deck.len(),
            discard_top: state.discard_top().copied(),
            discard_count: state.discard_pile.len(),
            drawn_card: state.drawn_card.filter(|_| holder == Some(viewer)),
            has_drawn_card: state.drawn_card.is_some(),
            final_round_trigger: state
                .final_round_trigger
                .and_then(|seat| state.players.get(seat))
                .map(|p| p.player_id.clone()),
            final_round_turns_remaining: state.final_round_turns_remaining,
            players,
            result: state.result.clone(),
        }
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| &p.player_id == player_id)
    }
}

fn project_player(
    seat: usize,
    player: &PlayerState,
    viewer: &PlayerId,
    display_names: &HashMap<PlayerId, String>,
) -> PlayerView {
    let is_you = &player.player_id == viewer;
    let slots = player
        .hand
        .iter()
        .zip(player.face_up)
        .map(|(card, face_up)| SlotView {
            card: (is_you || face_up).then_some(*card),
            face_up,
        })
        .collect();

    PlayerView {
        player_id: player.player_id.clone(),
        display_name: display_names
            .get(&player.player_id)
            .cloned()
            .unwrap_or_else(|| player.player_id.to_string()),
        seat,
        is_you,
        slots,
        initial_flips: player.initial_flips,
        all_flipped: player.all_flipped,
        visible_score: player.visible_score(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Deck;

    fn alice() -> PlayerId {
        PlayerId::new("alice")
    }

    fn bob() -> PlayerId {
        PlayerId::new("bob")
    }

    fn started() -> GameState {
        let mut state =
            GameState::with_deck(GameId::new("g1"), vec![alice(), bob()], Deck::standard())
                .unwrap();
        state.flip_initial_card(&alice(), 0).unwrap();
        state.flip_initial_card(&alice(), 3).unwrap();
        state.flip_initial_card(&bob(), 1).unwrap();
        state.flip_initial_card(&bob(), 5).unwrap();
        state
    }

    #[test]
    fn test_own_cards_are_visible() {
        let state = started();
        let view = GameView::for_viewer(&state, &alice(), &HashMap::new());
        let me = view.player(&alice()).unwrap();

        assert!(me.is_you);
        assert!(me.slots.iter().all(|slot| slot.card.is_some()));
        assert!(me.slots[0].face_up);
        assert!(!me.slots[1].face_up);
        assert_eq!(me.slots[1].card, Some(state.players[0].hand[1]));
    }

    #[test]
    fn test_opponent_face_down_cards_are_hidden() {
        let state = started();
        let view = GameView::for_viewer(&state, &alice(), &HashMap::new());
        let them = view.player(&bob()).unwrap();

        assert!(!them.is_you);
        for (idx, slot) in them.slots.iter().enumerate() {
            if state.players[1].face_up[idx] {
                assert_eq!(slot.card, Some(state.players[1].hand[idx]));
            } else {
                assert_eq!(slot.card, None);
            }
        }

        // nothing about bob's face-down cards appears anywhere in the JSON
        let json = serde_json::to_string(&view).unwrap();
        let hidden = serde_json::to_string(&state.players[1].hand[0]).unwrap();
        assert!(!json.contains(&hidden));
    }

    #[test]
    fn test_drawn_card_only_shown_to_holder() {
        let mut state = started();
        state.draw_from_deck(&alice()).unwrap();
        let drawn = state.drawn_card;

        let mine = GameView::for_viewer(&state, &alice(), &HashMap::new());
        let theirs = GameView::for_viewer(&state, &bob(), &HashMap::new());

        assert_eq!(mine.drawn_card, drawn);
        assert!(mine.has_drawn_card);
        assert_eq!(theirs.drawn_card, None);
        assert!(theirs.has_drawn_card);
    }

    #[test]
    fn test_public_fields() {
        let state = started();
        let names = HashMap::from([(alice(), "Alice".to_string())]);
        let view = GameView::for_viewer(&state, &bob(), &names);

        assert_eq!(view.phase, Phase::MainGame);
        assert_eq!(view.version, state.version);
        assert_eq!(view.current_player_id, Some(alice()));
        assert_eq!(view.deck_count, state.deck.len());
        assert_eq!(view.discard_top, state.discard_top().copied());
        assert_eq!(view.players[0].display_name, "Alice");
        assert_eq!(view.players[1].display_name, "bob");
        assert_eq!(view.players[1].visible_score, state.players[1].visible_score());
    }
}
