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

//! Feature-vector builders: the base 4-per-point encoding shared by every
//! net, and the race/contact/crashed extensions on top of it (spec §4.4).

use tavli_base::tables::{ESCAPES, ESCAPES_EXCLUDING_NEAREST, WAYS_TO_REACH};
use tavli_base::{Board, Player};

const BASE_INPUTS_PER_SIDE: usize = 100;
const MORE_INPUTS_PER_SIDE: usize = 25;

fn b2f(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Four features for one (side, point) pair: "exactly one", "exactly two",
/// "three or more", and `(n-3)/2` beyond three (spec §4.4).
fn push_point_features(out: &mut Vec<f32>, n: u8) {
    out.push(b2f(n == 1));
    out.push(b2f(n == 2));
    out.push(b2f(n >= 3));
    out.push(if n > 3 { f32::from(n - 3) / 2.0 } else { 0.0 });
}

/// The 100 base features for one side: 25 points (24 plus bar) x 4 features.
fn base_inputs_for(board: &Board, player: Player) -> Vec<f32> {
    let mut out = Vec::with_capacity(BASE_INPUTS_PER_SIDE);
    for p in 0..25 {
        push_point_features(&mut out, board[(player, p)]);
    }
    out
}

/// The 200-feature base encoding (both sides), used directly by the crashed
/// and contact nets underneath their "more inputs" extension.
#[must_use]
pub fn base_inputs(board: &Board) -> Vec<f32> {
    let mut out = base_inputs_for(board, Player::Zero);
    out.extend(base_inputs_for(board, Player::One));
    out
}

/// 214-feature race encoding: 92 "base-like" point features per side (23
/// playing points, no bar term since a race position never has a chequer on
/// the bar) plus 14 men-off one-hot values and 1 cross-over count per side.
#[must_use]
pub fn race_inputs(board: &Board) -> Vec<f32> {
    let mut out = Vec::with_capacity(214);
    for &player in &[Player::Zero, Player::One] {
        for p in 0..23 {
            push_point_features(&mut out, board[(player, p)]);
        }
        let off = 15u32.saturating_sub(board.on_board(player));
        for i in 0..14u32 {
            out.push(f32::from(off == i + 1));
        }
        out.push(cross_overs(board, player) as f32);
    }
    out
}

/// Number of quadrant boundaries a side's chequers must still cross to get
/// home: each chequer on point `p` (0-indexed from its own ace point) must
/// cross `p / 6` quadrant boundaries.
fn cross_overs(board: &Board, player: Player) -> u32 {
    (0..24).map(|p| (board[(player, p)] as u32) * (p as u32 / 6)).sum()
}

/// How many rolls out of 21 let the back-most chequer escape the 12-point
/// window ahead of it, given the opponent's blocking points.
fn escapes_for(board: &Board, player: Player, exclude_nearest: bool) -> f32 {
    let opp = player.other();
    let mut mask: u16 = 0;
    if let Some(back) = board.back_point(player) {
        if back < 24 {
            for offset in 1..=12usize {
                let point = back + offset;
                if point > 23 {
                    break;
                }
                let opp_point = 23 - point;
                if board[(opp, opp_point)] >= 2 {
                    mask |= 1 << (offset - 1);
                }
            }
        }
    }
    let table = if exclude_nearest { &ESCAPES_EXCLUDING_NEAREST } else { &ESCAPES };
    f32::from(table[mask as usize]) / 21.0
}

/// Pip count still needed by `player`'s most-back chequer, weighted by the
/// "ways to hit" table: an approximation of how exposed that chequer is to a
/// direct or indirect shot (spec §4.4's `I_PIPLOSS`-family features use this
/// table as their basis).
fn pip_loss_weight(board: &Board, player: Player) -> f32 {
    let opp = player.other();
    let mut weight = 0.0f32;
    for p in 0..24 {
        if board[(player, p)] != 1 {
            continue;
        }
        for d in 1..=24u32 {
            let dest = p as i32 - d as i32;
            if dest < 0 {
                continue;
            }
            let opp_point = 23 - dest as usize;
            if board[(opp, opp_point)] >= 2 {
                weight += f32::from(WAYS_TO_REACH[d as usize]) / 36.0;
            }
        }
    }
    weight
}

/// The 25 "more inputs" features for one side used by the contact and
/// crashed nets: 3 men-off features plus 22 positional features. Several
/// positional features (I_MOMENT2, I_TIMING, I_BACKG/I_BACKG1) are
/// implemented with the simpler of two equivalent formulations named in
/// spec §4.4, documented as a grounded simplification in DESIGN.md.
fn more_inputs_for(board: &Board, player: Player, all_men_off_encoding: bool) -> Vec<f32> {
    let mut out = Vec::with_capacity(MORE_INPUTS_PER_SIDE);
    let off = 15u32.saturating_sub(board.on_board(player));
    if all_men_off_encoding {
        out.push((off == 0) as u8 as f32);
        out.push(f32::from(off.min(14)) / 14.0);
        out.push(f32::from(off) / 15.0);
    } else {
        out.push(f32::from(off) / 15.0);
        out.push(f32::from(off.min(14)) / 14.0);
        out.push((off > 0) as u8 as f32);
    }

    let opp = player.other();
    let back = board.back_point(player);

    // I_BREAK_CONTACT: how many pips of the back chequer's own side still
    // overlap the opponent's home board.
    let break_contact = back.map_or(0.0, |b| (b as f32 - 17.0).max(0.0) / 7.0);
    out.push(break_contact);

    // I_BACK_CHEQUER: position of the most-back chequer, normalized.
    out.push(back.map_or(0.0, |b| b as f32 / 24.0));

    // I_BACK_ANCHOR: most-back point with 2+ own chequers (an anchor).
    let back_anchor = (0..24).rev().find(|&p| board[(player, p)] >= 2);
    out.push(back_anchor.map_or(0.0, |p| p as f32 / 24.0));

    // I_FORWARD_ANCHOR: most-forward (smallest index) anchor in opponent territory.
    let forward_anchor = (18..24).find(|&p| board[(player, p)] >= 2);
    out.push(forward_anchor.map_or(0.0, |p| (p as f32 - 18.0) / 5.0));

    // I_PIPLOSS: exposure-weighted pip-loss estimate for blots.
    out.push(pip_loss_weight(board, player).min(1.0));

    // I_P1 / I_P2: blot counts on the two home-most points.
    out.push(f32::from(board[(player, 0)] == 1));
    out.push(f32::from(board[(player, 1)] == 1));

    // I_BACKESCAPES / I_BACKRESCAPES: escape chances for the back chequer.
    out.push(escapes_for(board, player, false));
    let back_rescapes = escapes_for(board, player, true);
    // I_ACONTAIN / I_ACONTAIN2: anchor-adjusted containment strength,
    // approximated from the opponent's blocking density ahead of our back chequer.
    let contain = back.map_or(0.0, |b| {
        (0..6).filter(|&i| b + i < 24 && board[(opp, 23 - (b + i))] >= 2).count() as f32 / 6.0
    });
    out.push(contain);
    out.push(contain * contain);

    // I_CONTAIN / I_CONTAIN2: same, counted over the whole board ahead.
    let contain_full = back.map_or(0.0, |b| {
        ((b + 1)..24).filter(|&p| board[(opp, 23 - p)] >= 2).count() as f32 / 24.0
    });
    out.push(contain_full);
    out.push(contain_full * contain_full);

    // I_MOBILITY: sum of legal single-die destinations from occupied points.
    let mobility: f32 = (0..24)
        .filter(|&p| board[(player, p)] > 0)
        .flat_map(|p| (1..=6u8).map(move |d| (p, d)))
        .filter(|&(p, d)| p >= d as usize && board[(opp, 23 - (p - d as usize))] < 2)
        .count() as f32
        / 36.0;
    out.push(mobility);

    // I_MOMENT2: variance of own chequer positions (simpler formulation: the
    // second moment about the mean position, not gnubg's exact weighting).
    let positions: Vec<f32> = (0..24).flat_map(|p| std::iter::repeat(p as f32).take(board[(player, p)] as usize)).collect();
    let moment2 = if positions.is_empty() {
        0.0
    } else {
        let mean = positions.iter().sum::<f32>() / positions.len() as f32;
        positions.iter().map(|&x| (x - mean).powi(2)).sum::<f32>() / (positions.len() as f32 * 24.0 * 24.0)
    };
    out.push(moment2);

    out.push(f32::from(board[(player, 0)] >= 2)); // I_ENTER: ace point held
    out.push(f32::from(board[(player, 1)] >= 2)); // I_ENTER2: deuce point held

    // I_TIMING: pip count still to play before crunching becomes likely
    // (simpler formulation: normalized pip count of non-home chequers).
    let timing = (6..24).map(|p| board[(player, p)] as u32 * (p as u32 + 1)).sum::<u32>() as f32 / 300.0;
    out.push(timing.min(1.0));

    out.push(back_anchor.map_or(0.0, |p| if p >= 18 { 1.0 } else { 0.0 })); // I_BACKBONE
    // I_BACKG / I_BACKG1: simpler formulation counting own chequers still deep
    // in the opponent's home board (back-game indicator), rather than the
    // original's exact two-anchor classification.
    let deep = (18..24).map(|p| board[(player, p)] as u32).sum::<u32>();
    out.push(f32::from(deep >= 2) * (deep.min(4) as f32 / 4.0));
    out.push(f32::from(deep >= 3) * (deep.min(4) as f32 / 4.0));

    out.push((300.0 - (0..24).map(|p| board[(player, p)] as u32 * (p as u32 + 1)).sum::<u32>() as f32).max(0.0) / 300.0); // I_FREEPIP
    out.push(back_rescapes);

    out
}

/// 250-feature contact/crashed encoding: the 200-feature base plus 25 "more
/// inputs" per side, crashed using the "all chequers" men-off encoding and
/// contact using the "non-crashed" encoding (spec §4.4).
#[must_use]
pub fn contact_inputs(board: &Board) -> Vec<f32> {
    let mut out = base_inputs(board);
    out.extend(more_inputs_for(board, Player::Zero, false));
    out.extend(more_inputs_for(board, Player::One, false));
    out
}

#[must_use]
pub fn crashed_inputs(board: &Board) -> Vec<f32> {
    let mut out = base_inputs(board);
    out.extend(more_inputs_for(board, Player::Zero, true));
    out.extend(more_inputs_for(board, Player::One, true));
    out
}

/// 200-feature pruning-net input: the base encoding alone, shared by all
/// three pruning nets regardless of class.
#[must_use]
pub fn prune_inputs(board: &Board) -> Vec<f32> {
    base_inputs(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavli_base::Variation;

    #[test]
    fn base_inputs_has_two_hundred_features() {
        let board = Board::starting(Variation::Standard);
        assert_eq!(base_inputs(&board).len(), 200);
    }

    #[test]
    fn race_inputs_has_214_features() {
        let board = Board::starting(Variation::Standard);
        assert_eq!(race_inputs(&board).len(), 214);
    }

    #[test]
    fn contact_inputs_has_250_features() {
        let board = Board::starting(Variation::Standard);
        assert_eq!(contact_inputs(&board).len(), 250);
    }

    #[test]
    fn crashed_inputs_has_250_features() {
        let board = Board::starting(Variation::Standard);
        assert_eq!(crashed_inputs(&board).len(), 250);
    }

    #[test]
    fn prune_inputs_has_two_hundred_features() {
        let board = Board::starting(Variation::Standard);
        assert_eq!(prune_inputs(&board).len(), 200);
    }

    #[test]
    fn all_features_are_finite() {
        let board = Board::starting(Variation::Standard);
        assert!(contact_inputs(&board).iter().all(|x| x.is_finite()));
    }
}
