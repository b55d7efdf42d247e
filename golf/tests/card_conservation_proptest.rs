//! Property tests: no sequence of actions, legal or not, loses or creates a
//! card, and the version moves by exactly one per accepted action.

use golf::game::{Deck, GameId, GameState, Phase, PlayerAction, PlayerId, entities::HAND_SIZE};
use proptest::prelude::*;

fn action_strategy() -> impl Strategy<Value = PlayerAction> {
    prop_oneof![
        (0..HAND_SIZE + 1).prop_map(|index| PlayerAction::InitialFlip { index }),
        Just(PlayerAction::DrawDeck),
        Just(PlayerAction::DrawDiscard),
        (0..HAND_SIZE + 1).prop_map(|index| PlayerAction::SwapCard { index }),
        (0..HAND_SIZE + 1).prop_map(|index| PlayerAction::DiscardFlip { index }),
    ]
}

fn new_game() -> GameState {
    GameState::with_deck(
        GameId::new("prop"),
        vec![PlayerId::new("p0"), PlayerId::new("p1")],
        Deck::shuffled(),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn test_cards_are_conserved(
        steps in prop::collection::vec((0usize..2, action_strategy()), 0..200)
    ) {
        let mut game = new_game();
        let mut accepted = 0i64;

        for (seat, action) in steps {
            let player = game.players[seat].player_id.clone();
            let before = game.clone();
            match game.apply(&player, action) {
                Ok(()) => accepted += 1,
                Err(_) => prop_assert_eq!(&game, &before),
            }
            prop_assert!(game.is_conserved());
        }

        prop_assert_eq!(game.version, 1 + accepted);
    }

    #[test]
    fn test_finished_games_reveal_everything(
        steps in prop::collection::vec((0usize..2, action_strategy()), 0..400)
    ) {
        let mut game = new_game();
        for (seat, action) in steps {
            let player = game.players[seat].player_id.clone();
            let _ = game.apply(&player, action);
        }

        if game.phase == Phase::Finished {
            prop_assert!(game.players.iter().all(|p| p.face_up.iter().all(|up| *up)));
            prop_assert!(game.drawn_card.is_none());
        }
        prop_assert!(game.final_round_turns_remaining >= 0);
    }
}
