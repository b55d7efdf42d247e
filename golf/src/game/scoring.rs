//! Point values and column-cancellation scoring.

use super::entities::{Card, HAND_SIZE, ROW_SIZE, Rank};

/// Points for a single card. Lower is better.
#[must_use]
pub const fn card_value(card: &Card) -> i32 {
    match card.rank {
        Rank::Ace => 1,
        Rank::Two => 2,
        Rank::Three => 3,
        Rank::Four => 4,
        Rank::Five => 5,
        Rank::Six => 6,
        Rank::Seven => 7,
        Rank::Eight => 8,
        Rank::Nine => 9,
        Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
        Rank::Joker => -2,
    }
}

/// Score of one column (`col` in the top row, `col + 3` below it).
///
/// A face-up pair of equal rank cancels to zero regardless of suit, two
/// jokers included. Otherwise every face-up card counts on its own and
/// face-down cards count nothing.
#[must_use]
pub fn column_score(hand: &[Card; HAND_SIZE], face_up: &[bool; HAND_SIZE], col: usize) -> i32 {
    let (top, bottom) = (col, col + ROW_SIZE);
    if face_up[top] && face_up[bottom] && hand[top].rank == hand[bottom].rank {
        return 0;
    }

    [top, bottom]
        .into_iter()
        .filter(|&idx| face_up[idx])
        .map(|idx| card_value(&hand[idx]))
        .sum()
}

/// Sum of the three column scores.
#[must_use]
pub fn hand_score(hand: &[Card; HAND_SIZE], face_up: &[bool; HAND_SIZE]) -> i32 {
    (0..ROW_SIZE).map(|col| column_score(hand, face_up, col)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit;

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn test_card_values() {
        assert_eq!(card_value(&card(Rank::Ace, Suit::Hearts)), 1);
        assert_eq!(card_value(&card(Rank::Seven, Suit::Clubs)), 7);
        assert_eq!(card_value(&card(Rank::Ten, Suit::Spades)), 10);
        assert_eq!(card_value(&card(Rank::Jack, Suit::Spades)), 10);
        assert_eq!(card_value(&card(Rank::Queen, Suit::Diamonds)), 10);
        assert_eq!(card_value(&card(Rank::King, Suit::Hearts)), 10);
        assert_eq!(card_value(&Card::joker()), -2);
    }

    #[test]
    fn test_matching_column_cancels_across_suits() {
        let hand = [
            card(Rank::Five, Suit::Hearts),
            card(Rank::King, Suit::Clubs),
            card(Rank::Two, Suit::Clubs),
            card(Rank::Five, Suit::Spades),
            card(Rank::Three, Suit::Diamonds),
            card(Rank::Ace, Suit::Diamonds),
        ];
        let face_up = [true; HAND_SIZE];

        assert_eq!(column_score(&hand, &face_up, 0), 0);
        assert_eq!(column_score(&hand, &face_up, 1), 13);
        assert_eq!(column_score(&hand, &face_up, 2), 3);
        assert_eq!(hand_score(&hand, &face_up), 16);
    }

    #[test]
    fn test_two_jokers_cancel_to_zero() {
        let hand = [
            Card::joker(),
            card(Rank::Four, Suit::Clubs),
            card(Rank::Four, Suit::Hearts),
            Card::joker(),
            card(Rank::Six, Suit::Clubs),
            card(Rank::Nine, Suit::Hearts),
        ];
        let face_up = [true; HAND_SIZE];

        assert_eq!(column_score(&hand, &face_up, 0), 0);
        assert_eq!(hand_score(&hand, &face_up), 10 + 13);
    }

    #[test]
    fn test_single_joker_is_negative() {
        let hand = [
            Card::joker(),
            card(Rank::Ace, Suit::Clubs),
            card(Rank::Ace, Suit::Hearts),
            card(Rank::Two, Suit::Clubs),
            card(Rank::Ace, Suit::Spades),
            card(Rank::Ace, Suit::Diamonds),
        ];
        let face_up = [true; HAND_SIZE];
        assert_eq!(column_score(&hand, &face_up, 0), 0);
        assert_eq!(hand_score(&hand, &face_up), 0);
    }

    #[test]
    fn test_face_down_cards_score_nothing() {
        let hand = [
            card(Rank::Five, Suit::Hearts),
            card(Rank::King, Suit::Clubs),
            card(Rank::Two, Suit::Clubs),
            card(Rank::Five, Suit::Spades),
            card(Rank::Three, Suit::Diamonds),
            card(Rank::Ace, Suit::Diamonds),
        ];
        let face_up = [true, false, false, false, true, false];

        // the pair of fives only cancels once both are showing
        assert_eq!(column_score(&hand, &face_up, 0), 5);
        assert_eq!(hand_score(&hand, &face_up), 8);
        assert_eq!(hand_score(&hand, &[false; HAND_SIZE]), 0);
    }
}
