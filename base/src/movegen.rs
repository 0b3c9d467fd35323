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

//! Legal move enumeration for a single (board, dice) pair: the Chris rule,
//! bar-first entry, and bear-off legality, feeding [`MoveList::consider`]'s
//! dominance filter.

use crate::board::{Board, Player, BAR};
use crate::dice::Dice;
use crate::moves::{Move, MoveList, SubMove};
use crate::position::PositionKey;

/// Upper bound on candidates explored per (board, dice) pair (spec §4.7).
const SAFETY_CAP: usize = 3875;

fn pip_distance(point: u8) -> u32 {
    if point as usize == BAR {
        25
    } else {
        point as u32 + 1
    }
}

/// Is `dest` (in the mover's own-point coordinates) occupied by two or more
/// of the opponent's chequers? The opponent's mirror point is `23 - dest`.
fn is_blocked(board: &Board, dest: u8) -> bool {
    board[(Player::One, 23 - dest as usize)] >= 2
}

/// Apply one sub-move in place: moves the mover's chequer and, if it lands
/// on a lone enemy blot, sends that chequer to the opponent's bar.
fn apply_submove(board: &mut Board, player: Player, sub: SubMove) {
    board[(player, sub.from as usize)] -= 1;
    if let Some(to) = sub.to {
        let opp = player.other();
        let opp_point = 23 - to as usize;
        if board[(opp, opp_point)] == 1 {
            board[(opp, opp_point)] = 0;
            board[(opp, BAR)] += 1;
        }
        board[(player, to as usize)] += 1;
    }
}

/// Every distinct way to use one `die` from the current board, in the
/// generator's fixed visitation order: bar entry if a chequer is on the bar,
/// otherwise each occupied point from 23 down to 0.
fn candidates_for_die(board: &Board, player: Player, die: u8) -> Vec<SubMove> {
    let mut out = Vec::new();

    if board[(player, BAR)] > 0 {
        if die as usize <= 24 {
            let entry = 24 - die as usize;
            if !is_blocked(board, entry as u8) {
                out.push(SubMove::from_bar(entry as u8));
            }
        }
        return out;
    }

    let all_home = board.all_home(player);
    for p in (0..24usize).rev() {
        if board[(player, p)] == 0 {
            continue;
        }
        if p as u8 >= die {
            let to = p - die as usize;
            if !is_blocked(board, to as u8) {
                out.push(SubMove::normal(p as u8, to as u8));
            }
        } else if all_home {
            let pip = p as u8 + 1;
            if pip == die {
                out.push(SubMove::bear_off(p as u8));
            } else if pip < die {
                let higher_occupied = (p + 1..24).any(|q| board[(player, q)] > 0);
                if !higher_occupied {
                    out.push(SubMove::bear_off(p as u8));
                }
            }
        }
    }
    out
}

fn finalize(board: &Board, submoves: &[SubMove], pips: u32, list: &mut MoveList, used: &mut usize) {
    if submoves.is_empty() || *used >= SAFETY_CAP {
        return;
    }
    *used += 1;
    let key = PositionKey::from_board(board);
    list.consider(Move::unscored(submoves.to_vec(), key, submoves.len() as u8, pips));
}

#[allow(clippy::too_many_arguments)]
fn generate_recursive(
    board: Board,
    player: Player,
    dice_seq: &[u8],
    submoves: &mut Vec<SubMove>,
    pips: u32,
    list: &mut MoveList,
    used: &mut usize,
) {
    if *used >= SAFETY_CAP {
        return;
    }
    let Some((&die, rest)) = dice_seq.split_first() else {
        finalize(&board, submoves, pips, list, used);
        return;
    };

    let candidates = candidates_for_die(&board, player, die);
    if candidates.is_empty() {
        finalize(&board, submoves, pips, list, used);
        return;
    }

    for cand in candidates {
        let mut next_board = board;
        apply_submove(&mut next_board, player, cand);
        let traveled = pip_distance(cand.from) - cand.to.map_or(0, pip_distance);
        submoves.push(cand);
        generate_recursive(next_board, player, rest, submoves, pips + traveled, list, used);
        submoves.pop();
    }
}

/// Enumerate every legal play of `dice` for `player` on `board`, already
/// filtered by the longer/heavier-play dominance rule. Doubles try all four
/// uses of the one die; non-doubles try both orderings of the two dice.
#[must_use]
pub fn generate_moves(board: &Board, dice: Dice, player: Player) -> MoveList {
    let mut list = MoveList::new();
    let mut used = 0usize;
    let mut submoves = Vec::new();

    if dice.is_double() {
        let seq = [dice.0; 4];
        generate_recursive(*board, player, &seq, &mut submoves, 0, &mut list, &mut used);
    } else {
        generate_recursive(*board, player, &[dice.0, dice.1], &mut submoves, 0, &mut list, &mut used);
        submoves.clear();
        generate_recursive(*board, player, &[dice.1, dice.0], &mut submoves, 0, &mut list, &mut used);
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Variation;

    #[test]
    fn opening_roll_has_legal_plays() {
        let board = Board::starting(Variation::Standard);
        let list = generate_moves(&board, Dice::new(3, 1), Player::Zero);
        assert!(!list.is_empty());
        assert_eq!(list.get(0).unwrap().dice_used, 2);
    }

    #[test]
    fn forced_single_bearoff_is_the_only_move() {
        let mut board = Board::empty();
        board[(Player::Zero, 0)] = 1;
        board[(Player::One, 1)] = 1;
        let list = generate_moves(&board, Dice::new(6, 1), Player::Zero);
        assert_eq!(list.len(), 1);
        let mv = list.get(0).unwrap();
        assert_eq!(mv.submoves, vec![SubMove::bear_off(0)]);
    }

    #[test]
    fn bar_chequer_must_enter_before_anything_else() {
        let mut board = Board::empty();
        board[(Player::Zero, BAR)] = 1;
        board[(Player::Zero, 5)] = 1;
        // opponent's ace point (our point 23) is open.
        let list = generate_moves(&board, Dice::new(1, 2), Player::Zero);
        for mv in list.iter() {
            assert_eq!(mv.submoves[0].from as usize, BAR);
        }
    }

    #[test]
    fn landing_on_a_blot_sends_it_to_the_bar() {
        let mut board = Board::empty();
        board[(Player::Zero, 10)] = 1;
        board[(Player::One, 23 - 7)] = 1; // our point 7, a lone enemy blot
        let list = generate_moves(&board, Dice::new(3, 1), Player::Zero);
        let hit = list.iter().find(|m| m.submoves.iter().any(|s| s.to == Some(7)));
        assert!(hit.is_some());
    }

    #[test]
    fn doubles_can_use_all_four_dice() {
        let mut board = Board::empty();
        board[(Player::Zero, 23)] = 4;
        let list = generate_moves(&board, Dice::new(2, 2), Player::Zero);
        assert_eq!(list.get(0).unwrap().dice_used, 4);
    }

    #[test]
    fn no_legal_move_yields_empty_list() {
        let mut board = Board::empty();
        board[(Player::Zero, 23)] = 1;
        for p in 0..12 {
            board[(Player::One, p)] = 2;
        }
        let list = generate_moves(&board, Dice::new(1, 2), Player::Zero);
        assert!(list.is_empty());
    }
}
