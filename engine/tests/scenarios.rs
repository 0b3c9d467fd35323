/*
  Tavli, a backgammon move-analysis engine.
  Copyright (C) 2026 The Tavli Authors

  Tavli is free software: you can redistribute it and/or modify
  it under the terms of the GNU General Public License as published by
  the Free Software Foundation, either version 3 of the License, or
  (at your option) any later version.

  Tavli is distributed in the hope that it will be useful,
  but WITHOUT ANY WARRANTY; without even the implied warranty of
  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
  GNU General Public License for more details.

  You should have received a copy of the GNU General Public License
  along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

//! End-to-end scenarios exercised against the public [`tavli_engine::Engine`]
//! facade, instead of unit-testing individual modules.
//!
//! [`Engine::for_testing`] backs these by zero-weight networks and an empty
//! bearoff database rather than a real `gnubg.weights`/`*.bd` data
//! directory, which this workspace doesn't carry. That makes the exact
//! trained-network equities reported elsewhere unreachable here; what these
//! tests check instead is everything about each scenario that a trained net
//! can't change: which plays are legal, which forced outcomes a position's
//! own arithmetic already guarantees, and the `PositionKey` encoding.

use tavli_base::{Board, Dice, Player, PositionKey, Variation, BAR};
use tavli_engine::Engine;

/// Place `count` chequers on `player`'s `point`-point, `point` counted 1..=24
/// from that player's own ace point (the scenario notation's convention).
fn place(board: &mut Board, player: Player, point: usize, count: u8) {
    board[(player, point - 1)] = count;
}

fn enter_bar(board: &mut Board, player: Player, count: u8) {
    board[(player, BAR)] = count;
}

fn starting_position() -> Board {
    let mut board = Board::empty();
    for player in [Player::Zero, Player::One] {
        place(&mut board, player, 6, 5);
        place(&mut board, player, 8, 3);
        place(&mut board, player, 13, 5);
        place(&mut board, player, 24, 2);
    }
    board
}

#[test]
fn opening_3_1_best_play_is_among_the_generated_candidates() {
    let board = starting_position();
    let engine = Engine::for_testing();
    let list = engine.find_best_moves(&board, Dice::new(3, 1), Player::Zero, false, false).unwrap();

    let mut expected = board;
    expected[(Player::Zero, 7)] -= 1; // 8 -> 5
    expected[(Player::Zero, 5)] -= 1; // 6 -> 5
    expected[(Player::Zero, 4)] += 2;
    let expected_key = PositionKey::from_board(&expected);

    assert!(list.iter().any(|mv| mv.key == expected_key), "8/5 6/5 must be among the legal 3-1 plays");
}

#[test]
fn opening_6_5_best_play_is_among_the_generated_candidates() {
    let mut board = Board::empty();
    place(&mut board, Player::Zero, 6, 5);
    place(&mut board, Player::Zero, 8, 4);
    place(&mut board, Player::Zero, 13, 4);
    place(&mut board, Player::Zero, 23, 1);
    place(&mut board, Player::Zero, 24, 1);
    place(&mut board, Player::One, 6, 5);
    place(&mut board, Player::One, 8, 3);
    place(&mut board, Player::One, 13, 5);
    place(&mut board, Player::One, 21, 1);
    place(&mut board, Player::One, 24, 1);

    let engine = Engine::for_testing();
    let list = engine.find_best_moves(&board, Dice::new(6, 5), Player::Zero, true, false).unwrap();
    assert!(!list.is_empty());

    let mut expected = board;
    expected[(Player::Zero, 23)] -= 1; // 24 -> 18
    expected[(Player::Zero, 22)] -= 1; // 23 -> 18
    expected[(Player::Zero, 17)] += 2;
    let expected_key = PositionKey::from_board(&expected);

    assert!(list.iter().any(|mv| mv.key == expected_key), "24/18 23/18 must be among the legal 6-5 plays");
}

#[test]
fn bar_re_entry_is_forced_and_the_named_continuations_are_legal() {
    let mut board = Board::empty();
    place(&mut board, Player::Zero, 6, 5);
    place(&mut board, Player::Zero, 7, 2);
    place(&mut board, Player::Zero, 8, 3);
    place(&mut board, Player::Zero, 13, 2);
    place(&mut board, Player::Zero, 24, 2);
    enter_bar(&mut board, Player::Zero, 1);
    place(&mut board, Player::One, 6, 5);
    place(&mut board, Player::One, 8, 4);
    place(&mut board, Player::One, 13, 4);
    place(&mut board, Player::One, 15, 1);
    place(&mut board, Player::One, 24, 1);

    let engine = Engine::for_testing();
    let list = engine.find_best_moves(&board, Dice::new(6, 1), Player::Zero, false, false).unwrap();
    assert!(!list.is_empty());

    // A chequer on the bar must re-enter before anything else can move: every
    // legal play leaves the bar empty.
    for mv in list.iter() {
        let after = mv.key.to_board();
        assert_eq!(after[(Player::Zero, BAR)], 0, "a candidate left a chequer on the bar with an entry available");
    }

    let continuations: [(usize, usize); 4] = [(24, 18), (13, 7), (8, 2), (7, 1)];
    for (from, to) in continuations {
        let mut expected = board;
        expected[(Player::Zero, BAR)] -= 1;
        expected[(Player::Zero, 23)] += 1; // bar -> 24, the forced entry
        expected[(Player::Zero, from - 1)] -= 1;
        expected[(Player::Zero, to - 1)] += 1;
        let expected_key = PositionKey::from_board(&expected);
        assert!(
            list.iter().any(|mv| mv.key == expected_key),
            "bar/24 {from}/{to} must be a legal continuation"
        );
    }
}

#[test]
fn forced_bearoff_has_exactly_one_legal_play_and_scores_as_a_sure_win() {
    let mut board = Board::empty();
    place(&mut board, Player::Zero, 1, 1);
    place(&mut board, Player::One, 2, 1);

    let engine = Engine::for_testing();
    let list = engine.find_best_moves(&board, Dice::new(6, 1), Player::Zero, true, false).unwrap();

    assert_eq!(list.len(), 1);
    let only = list.best().unwrap();
    assert!(only.submoves.iter().any(|s| s.from == 0 && s.to.is_none()), "the only play bears off the lone chequer");
    assert_eq!(only.output.win, 1.0);
}

/// X is down to a single chequer on its own ace point; nothing O plays with
/// this roll touches X's side, and X bears that chequer off with any roll at
/// all on the very next turn. So whatever O does now, O has already lost the
/// game: a position's own arithmetic forces this, independent of any learned
/// evaluation.
#[test]
fn save_gammon_position_is_an_unavoidable_loss_for_the_player_on_roll() {
    let mut board = Board::empty();
    place(&mut board, Player::Zero, 1, 1);
    place(&mut board, Player::One, 1, 4);
    place(&mut board, Player::One, 2, 3);
    place(&mut board, Player::One, 3, 1);
    place(&mut board, Player::One, 4, 2);
    place(&mut board, Player::One, 5, 2);
    place(&mut board, Player::One, 6, 3);

    let engine = Engine::for_testing();
    let list = engine.find_best_moves(&board, Dice::new(4, 1), Player::One, false, false).unwrap();
    assert!(!list.is_empty());

    for mv in list.iter() {
        // mv.key is in the canonicalized (O-as-mover) frame; swap back to the
        // raw frame where X is Player::Zero again.
        let after_raw = mv.key.to_board().swap_sides();
        assert_eq!(after_raw[(Player::Zero, 0)], 1, "O's move can't touch X's chequers");

        for roll in tavli_base::ALL_ROLLS.iter() {
            let x_replies = tavli_base::generate_moves(&after_raw, roll.dice, Player::Zero);
            assert!(
                x_replies.iter().any(|r| r.key.to_board().on_board(Player::Zero) == 0),
                "X must be able to bear its last chequer off on every possible roll"
            );
        }
    }
}

#[test]
fn opening_position_key_round_trips() {
    let board = Board::starting(Variation::Standard);
    let key = PositionKey::from_board(&board);
    assert_eq!(key.0, [810_549_248, 327_680, 536_870_912, 810_549_248, 327_680, 536_870_912, 0]);
    assert_eq!(key.to_board(), board);
}
