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

//! Static leaf evaluation (§4.8): dispatch a classified board to the right
//! closed form, bearoff database or neural net, then apply the sanity-check
//! clamp. The board is always in the on-roll player's perspective: `Player::
//! Zero` is "us", `Player::One` is the opponent.

use tavli_base::{Board, EngineError, Player, PositionClass, RawOutput, Variation};

use crate::bearoff::{self, BearoffTables, OneSidedDb, RollDistribution, TwoSidedDb};
use crate::inputs;
use crate::neuralnet::{NetworkFamily, NeuralNet};

/// The loaded reference data a leaf evaluation reads from.
pub struct EvalResources<'a> {
    pub nets: &'a NetworkFamily,
    pub bearoff: &'a BearoffTables,
}

/// Evaluate `board`, already classified as `class`, for `variation`.
pub fn static_evaluate(
    board: &Board,
    class: PositionClass,
    variation: Variation,
    res: &EvalResources,
) -> Result<RawOutput, EngineError> {
    let mut raw = match class {
        PositionClass::Over => over_output(board, variation),
        PositionClass::Hypergammon1 => hypergammon_output(board, res, 0)?,
        PositionClass::Hypergammon2 => hypergammon_output(board, res, 1)?,
        PositionClass::Hypergammon3 => hypergammon_output(board, res, 2)?,
        PositionClass::Bearoff2 | PositionClass::BearoffTwoSidedDisk => two_sided_bearoff_output(board, res)?,
        PositionClass::Bearoff1 | PositionClass::BearoffOneSidedDisk => {
            one_sided_bearoff_output(board, variation, res)?
        }
        PositionClass::Race => race_output(board, variation, res),
        PositionClass::Crashed => network_output(&res.nets.crashed, &inputs::crashed_inputs(board)),
        PositionClass::Contact => network_output(&res.nets.contact, &inputs::contact_inputs(board)),
    };
    // A forced win/loss (over) or an exact bearoff lookup can't violate these,
    // but network outputs routinely do by a hair; raise gammons to at least
    // cover any backgammon chance before the final clamp pulls the other way.
    raw.win_g = raw.win_g.max(raw.win_bg);
    raw.lose_g = raw.lose_g.max(raw.lose_bg);
    Ok(raw.sanity_clamped())
}

fn network_output(net: &NeuralNet, input: &[f32]) -> RawOutput {
    let out = net.evaluate(input);
    RawOutput { win: out[0], win_g: out[1], win_bg: out[2], lose_g: out[3], lose_bg: out[4] }
}

/// Points 18..=24 (own coordinates) are physically the opponent's home
/// board: a chequer left there when the game ends is the backgammon test.
fn has_chequer_in_opponents_home(board: &Board, player: Player) -> bool {
    (18..=24).any(|p| board[(player, p)] > 0)
}

fn over_output(board: &Board, variation: Variation) -> RawOutput {
    let full = u32::from(variation.chequers());

    if board.on_board(Player::One) == 0 {
        // The opponent has borne off everyone: we lost.
        let gammon = board.on_board(Player::Zero) == full;
        let backgammon = gammon && has_chequer_in_opponents_home(board, Player::Zero);
        return RawOutput {
            win: 0.0,
            win_g: 0.0,
            win_bg: 0.0,
            lose_g: f32::from(gammon),
            lose_bg: f32::from(backgammon),
        };
    }

    // classify() only dispatches Over when at least one side has borne
    // everyone off; it wasn't the opponent, so it must have been us.
    let gammon = board.on_board(Player::One) == full;
    let backgammon = gammon && has_chequer_in_opponents_home(board, Player::One);
    RawOutput { win: 1.0, win_g: f32::from(gammon), win_bg: f32::from(backgammon), lose_g: 0.0, lose_bg: 0.0 }
}

fn hypergammon_output(board: &Board, res: &EvalResources, slot: usize) -> Result<RawOutput, EngineError> {
    let db = res.bearoff.hypergammon[slot]
        .as_ref()
        .ok_or_else(|| EngineError::FormatInvalid { detail: "hypergammon database not loaded".into() })?;
    let points = db.points() as usize;
    let us = bearoff::bearoff_index(&bearoff::home_counts(board, Player::Zero, points), db.chequers());
    let them = bearoff::bearoff_index(&bearoff::home_counts(board, Player::One, points), db.chequers());
    let (output, _equities) = db.record(us, them)?;
    Ok(output)
}

/// Prefer the exhaustive database when it's loaded and `board`'s chequer
/// counts fit its range; it covers positions the compressed database, built
/// for a smaller chequer count, can't index.
fn select_two_sided<'a>(board: &Board, res: &'a EvalResources) -> Option<&'a TwoSidedDb> {
    if let Some(full) = &res.bearoff.two_sided_full {
        if board.on_board(Player::Zero) <= u32::from(full.chequers()) && board.on_board(Player::One) <= u32::from(full.chequers()) {
            return Some(full);
        }
    }
    res.bearoff.two_sided.as_ref()
}

fn select_one_sided<'a>(board: &Board, res: &'a EvalResources) -> &'a OneSidedDb {
    if let Some(full) = &res.bearoff.one_sided_full {
        if board.on_board(Player::Zero) <= u32::from(full.chequers()) && board.on_board(Player::One) <= u32::from(full.chequers()) {
            return full;
        }
    }
    &res.bearoff.one_sided
}

fn two_sided_bearoff_output(board: &Board, res: &EvalResources) -> Result<RawOutput, EngineError> {
    let db = select_two_sided(board, res)
        .ok_or_else(|| EngineError::FormatInvalid { detail: "two-sided bearoff database not loaded".into() })?;
    let points = db.points() as usize;
    let us = bearoff::bearoff_index(&bearoff::home_counts(board, Player::Zero, points), db.chequers());
    let them = bearoff::bearoff_index(&bearoff::home_counts(board, Player::One, points), db.chequers());
    let equity = db.cubeless_equity(us, them)?;
    Ok(RawOutput { win: equity / 2.0 + 0.5, win_g: 0.0, win_bg: 0.0, lose_g: 0.0, lose_bg: 0.0 })
}

fn dist_at(d: &RollDistribution, i: usize) -> f32 {
    d.probabilities.get(i).copied().unwrap_or(0.0)
}

fn tail_sum(d: &RollDistribution, from: usize, n: usize) -> f32 {
    (from..n).map(|j| dist_at(d, j)).sum()
}

fn one_sided_bearoff_output(board: &Board, variation: Variation, res: &EvalResources) -> Result<RawOutput, EngineError> {
    let db = select_one_sided(board, res);
    let points = db.points() as usize;
    let us_idx = bearoff::bearoff_index(&bearoff::home_counts(board, Player::Zero, points), db.chequers());
    let them_idx = bearoff::bearoff_index(&bearoff::home_counts(board, Player::One, points), db.chequers());
    let (us_win, us_gammon) = db.distributions(us_idx)?;
    let (them_win, them_gammon) = db.distributions(them_idx)?;

    let n = us_win.probabilities.len().max(them_win.probabilities.len()) + 1;

    // We're on roll, so a tie in rolls-to-finish goes our way.
    let mut win = 0.0f32;
    for i in 0..n {
        win += dist_at(&us_win, i) * tail_sum(&them_win, i, n);
    }

    let full = u32::from(variation.chequers());
    let mut win_g = 0.0f32;
    let mut lose_g = 0.0f32;
    if board.on_board(Player::Zero) == full || board.on_board(Player::One) == full {
        if let (Some(us_g), Some(them_g)) = (&us_gammon, &them_gammon) {
            for i in 0..n {
                win_g += dist_at(&us_win, i) * tail_sum(them_g, i, n);
            }
            for i in 0..n {
                lose_g += dist_at(&them_win, i) * tail_sum(us_g, i + 1, n);
            }
        }
    }

    Ok(RawOutput { win, win_g, win_bg: 0.0, lose_g, lose_bg: 0.0 })
}

/// A crude decay on the chance a chequer still trapped in the opponent's
/// home board clears before the race is decided: each additional trapped
/// chequer roughly halves the already-long odds of needing exactly the
/// biggest rolls to escape. This stands in for the source's precomputed
/// race-backgammon probability tables, which the retrieval pack didn't carry
/// (see DESIGN.md).
fn backgammon_escape_decay(trapped: u32) -> f32 {
    (1.0 / 6.0f32).powi(trapped.max(1) as i32)
}

fn race_backgammon_chances(board: &Board, variation: Variation, win: f32) -> (f32, f32) {
    let full = u32::from(variation.chequers());

    let win_bg = if board.on_board(Player::One) == full && has_chequer_in_opponents_home(board, Player::One) {
        let trapped: u32 = (18..=24).map(|p| u32::from(board[(Player::One, p)])).sum();
        win * backgammon_escape_decay(trapped)
    } else {
        0.0
    };

    let lose_bg = if board.on_board(Player::Zero) == full && has_chequer_in_opponents_home(board, Player::Zero) {
        let trapped: u32 = (18..=24).map(|p| u32::from(board[(Player::Zero, p)])).sum();
        (1.0 - win) * backgammon_escape_decay(trapped)
    } else {
        0.0
    };

    (win_bg, lose_bg)
}

fn race_output(board: &Board, variation: Variation, res: &EvalResources) -> RawOutput {
    let mut raw = network_output(&res.nets.race, &inputs::race_inputs(board));
    let (win_bg, lose_bg) = race_backgammon_chances(board, variation, raw.win);
    raw.win_bg = win_bg;
    raw.lose_bg = lose_bg;
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavli_base::{Board, Variation};

    #[test]
    fn opponent_borne_off_everything_is_a_certain_loss() {
        let mut board = Board::empty();
        board[(Player::Zero, 0)] = 15;
        let raw = over_output(&board, Variation::Standard);
        assert_eq!(raw.win, 0.0);
        assert_eq!(raw.lose_g, 1.0, "we never moved a chequer off: gammon loss");
        assert_eq!(raw.lose_bg, 0.0, "no chequer of ours sits in the opponent's home board");
    }

    #[test]
    fn we_borne_off_everything_with_a_chequer_left_deep_is_a_backgammon_win() {
        let mut board = Board::empty();
        board[(Player::One, 15)] = 14;
        board[(Player::One, 20)] = 1;
        let raw = over_output(&board, Variation::Standard);
        assert_eq!(raw.win, 1.0);
        assert_eq!(raw.win_g, 1.0);
        assert_eq!(raw.win_bg, 1.0);
    }

    #[test]
    fn ordinary_win_with_opponent_already_off_some_men_has_no_gammon() {
        let mut board = Board::empty();
        board[(Player::One, 2)] = 10;
        // opponent has already borne off 5 (15 - 10 on board), so no gammon.
        let raw = over_output(&board, Variation::Standard);
        assert_eq!(raw.win, 1.0);
        assert_eq!(raw.win_g, 0.0);
        assert_eq!(raw.win_bg, 0.0);
    }
}
