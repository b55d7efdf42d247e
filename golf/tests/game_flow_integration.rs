//! Integration tests for full game flows through the public engine API:
//! a fixed-deck scenario, turn enforcement, and the end-game trigger.

use golf::game::{
    Card, Deck, GameError, GameId, GameOutcome, GameState, Phase, PlayerAction, PlayerId, Rank,
    Suit, entities::DECK_SIZE,
};

fn alice() -> PlayerId {
    PlayerId::new("alice")
}

fn bob() -> PlayerId {
    PlayerId::new("bob")
}

/// A full deck whose first cards are `prefix`; the rest follow in standard
/// order with the prefix cards taken out.
fn deck_starting_with(prefix: &[Card]) -> Deck {
    let mut rest: Vec<Card> = Deck::standard().iter().copied().collect();
    for card in prefix {
        let pos = rest.iter().position(|c| c == card).unwrap();
        rest.remove(pos);
    }
    let mut cards = prefix.to_vec();
    cards.extend(rest);
    assert_eq!(cards.len(), DECK_SIZE);
    Deck::from_cards(cards)
}

fn new_game(deck: Deck) -> GameState {
    GameState::with_deck(GameId::new("scenario"), vec![alice(), bob()], deck).unwrap()
}

#[test]
fn test_fixed_deck_scenario() {
    let ace_hearts = Card::new(Rank::Ace, Suit::Hearts);
    let king_spades = Card::new(Rank::King, Suit::Spades);
    let two_hearts = Card::new(Rank::Two, Suit::Hearts);
    let deck = deck_starting_with(&[
        ace_hearts,
        king_spades,
        Card::new(Rank::Five, Suit::Clubs),
        Card::new(Rank::Five, Suit::Diamonds),
        two_hearts,
        Card::joker(),
    ]);
    let mut game = new_game(deck);
    assert_eq!(game.version, 1);
    assert_eq!(game.players[0].hand[0], ace_hearts);
    assert_eq!(game.players[0].hand[1], king_spades);

    game.flip_initial_card(&alice(), 0).unwrap();
    assert_eq!(game.version, 2);
    game.flip_initial_card(&alice(), 4).unwrap();
    assert_eq!(game.version, 3);
    assert!(game.players[0].face_up[0] && game.players[0].face_up[4]);
    assert_eq!(game.players[0].visible_score(), 1 + 2);

    game.flip_initial_card(&bob(), 2).unwrap();
    game.flip_initial_card(&bob(), 3).unwrap();
    assert_eq!(game.version, 5);
    assert_eq!(game.phase, Phase::MainGame);
    assert_eq!(game.current_turn, 0);

    let next = *game.deck.peek().unwrap();
    game.draw_from_deck(&alice()).unwrap();
    assert_eq!(game.version, 6);
    assert_eq!(game.drawn_card, Some(next));

    game.swap_card(&alice(), 1).unwrap();
    assert_eq!(game.version, 7);
    assert_eq!(game.discard_top(), Some(&king_spades));
    assert_eq!(game.players[0].hand[1], next);
    assert!(game.players[0].face_up[1]);
    assert_eq!(game.current_turn, 1);
    assert!(game.is_conserved());
}

#[test]
fn test_non_current_player_cannot_draw() {
    let mut game = new_game(Deck::standard());
    for (player, a, b) in [(alice(), 0, 3), (bob(), 1, 4)] {
        game.flip_initial_card(&player, a).unwrap();
        game.flip_initial_card(&player, b).unwrap();
    }
    let before = game.clone();

    assert_eq!(game.draw_from_deck(&bob()), Err(GameError::NotYourTurn));
    assert_eq!(game, before);
    assert_eq!(game.version, before.version);
}

#[test]
fn test_second_flip_in_same_row_rejected() {
    let mut game = new_game(Deck::standard());
    game.flip_initial_card(&alice(), 0).unwrap();
    assert_eq!(
        game.flip_initial_card(&alice(), 1),
        Err(GameError::InvalidInitialFlip)
    );
    assert_eq!(game.version, 2);
    assert!(!game.players[0].face_up[1]);
}

#[test]
fn test_full_game_to_result() {
    let mut game = new_game(Deck::shuffled());
    for player in [alice(), bob()] {
        game.apply(&player, PlayerAction::InitialFlip { index: 0 })
            .unwrap();
        game.apply(&player, PlayerAction::InitialFlip { index: 3 })
            .unwrap();
    }

    // Each turn flips the lowest face-down slot until someone is out
    let mut turns = 0;
    while !game.is_finished() {
        let seat = game.current_turn;
        let player = game.players[seat].player_id.clone();
        let target = game.players[seat]
            .face_up
            .iter()
            .position(|up| !up)
            .unwrap_or(0);

        game.apply(&player, PlayerAction::DrawDeck).unwrap();
        if game.players[seat].face_up[target] {
            game.apply(&player, PlayerAction::SwapCard { index: target })
                .unwrap();
        } else {
            game.apply(&player, PlayerAction::DiscardFlip { index: target })
                .unwrap();
        }
        assert!(game.is_conserved());

        if game.phase == Phase::FinalRound {
            assert_eq!(game.final_round_trigger, Some(0));
            assert_eq!(game.final_round_turns_remaining, 1);
        }
        turns += 1;
        assert!(turns < 20, "game should end within a handful of turns");
    }

    // alice flips out on her fourth turn; bob gets exactly one more
    assert_eq!(turns, 8);
    assert!(game.players.iter().all(|p| p.all_flipped));

    let result = game.finish_game().unwrap();
    let scores = game.final_scores();
    assert_eq!(result.scores, scores);
    match &result.outcome {
        GameOutcome::Winner(winner) => {
            let other = if *winner == alice() { bob() } else { alice() };
            assert!(scores[winner] < scores[&other]);
        }
        GameOutcome::Draw => assert_eq!(scores[&alice()], scores[&bob()]),
    }

    assert_eq!(
        game.apply(&alice(), PlayerAction::DrawDeck),
        Err(GameError::WrongPhase(Phase::Finished))
    );
    assert_eq!(game.finish_game(), Err(GameError::AlreadyFinalized));
}
