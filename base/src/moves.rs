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

//! A candidate play, and the list of candidates for one (board, dice) pair.

use crate::board::BAR;
use crate::position::PositionKey;

/// Search depth, in half-turns. `0` means "leaf, no recursive averaging".
pub type Ply = u8;

/// Point a single chequer moved off; 24 ([`BAR`]) is a valid source (entering
/// from the bar). `None` as a destination means the chequer was borne off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubMove {
    pub from: u8,
    pub to: Option<u8>,
}

impl SubMove {
    #[must_use]
    pub const fn from_bar(to: u8) -> SubMove {
        SubMove { from: BAR as u8, to: Some(to) }
    }

    #[must_use]
    pub const fn bear_off(from: u8) -> SubMove {
        SubMove { from, to: None }
    }

    #[must_use]
    pub const fn normal(from: u8, to: u8) -> SubMove {
        SubMove { from, to: Some(to) }
    }
}

/// The five raw neural-network/bearoff outputs: win probability, win-gammon,
/// win-backgammon, lose-gammon, lose-backgammon (lose probability is implied
/// as `1 - win`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawOutput {
    pub win: f32,
    pub win_g: f32,
    pub win_bg: f32,
    pub lose_g: f32,
    pub lose_bg: f32,
}

impl RawOutput {
    #[must_use]
    pub const fn zero() -> RawOutput {
        RawOutput { win: 0.0, win_g: 0.0, win_bg: 0.0, lose_g: 0.0, lose_bg: 0.0 }
    }

    #[must_use]
    pub fn lose(&self) -> f32 {
        1.0 - self.win
    }

    /// Swap the win/lose perspective: used after evaluating the opponent's
    /// reply, to bring the output back into the mover's perspective.
    #[must_use]
    pub fn flipped(&self) -> RawOutput {
        RawOutput {
            win: 1.0 - self.win,
            win_g: self.lose_g,
            win_bg: self.lose_bg,
            lose_g: self.win_g,
            lose_bg: self.win_bg,
        }
    }

    /// Clamp every component into the ranges spec §8's universal properties
    /// require: all in `[0, 1]`, gammons bounded by wins/losses, backgammons
    /// bounded by gammons.
    #[must_use]
    pub fn sanity_clamped(&self) -> RawOutput {
        let win = self.win.clamp(0.0, 1.0);
        let lose = 1.0 - win;
        let win_g = self.win_g.clamp(0.0, win);
        let lose_g = self.lose_g.clamp(0.0, lose);
        let win_bg = self.win_bg.clamp(0.0, win_g);
        let lose_bg = self.lose_bg.clamp(0.0, lose_g);
        RawOutput { win, win_g, win_bg, lose_g, lose_bg }
    }
}

/// One fully-played roll: the sub-moves applied, the resulting position, and
/// (once scored) the probability/equity outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct Move {
    pub submoves: Vec<SubMove>,
    pub key: PositionKey,
    /// Number of dice actually used (`cMoves`).
    pub dice_used: u8,
    /// Total pips used across all sub-moves (`cPips`).
    pub pips_used: u32,
    /// Primary ranking score: cubeful equity if requested, else cubeless
    /// equity (`rScore`).
    pub score: f32,
    /// Secondary tiebreaker: cubeless equity (`rScore2`).
    pub score2: f32,
    pub output: RawOutput,
    pub cubeless_equity: f32,
    pub cubeful_equity: f32,
}

impl Move {
    #[must_use]
    pub fn unscored(submoves: Vec<SubMove>, key: PositionKey, dice_used: u8, pips_used: u32) -> Move {
        Move {
            submoves,
            key,
            dice_used,
            pips_used,
            score: 0.0,
            score2: 0.0,
            output: RawOutput::zero(),
            cubeless_equity: 0.0,
            cubeful_equity: 0.0,
        }
    }
}

/// Candidate plays generated for a single (board, dice) pair. Enforces the
/// "longer/heavier play dominates" legality rule as candidates are added (see
/// [`MoveList::consider`]).
#[derive(Clone, Debug, Default)]
pub struct MoveList {
    moves: Vec<Move>,
    max_dice_used: u8,
    max_pips_used: u32,
    best_index: Option<usize>,
    best_score: f32,
}

impl MoveList {
    #[must_use]
    pub fn new() -> MoveList {
        MoveList { moves: Vec::new(), max_dice_used: 0, max_pips_used: 0, best_index: None, best_score: f32::NEG_INFINITY }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Move> {
        self.moves.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.moves.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Move> {
        self.moves.iter_mut()
    }

    /// Consider a newly generated candidate. A play using strictly more dice
    /// than every candidate seen so far — or the same dice but strictly more
    /// pips — empties the list and raises the dominance thresholds; a play
    /// using fewer dice or pips than the current thresholds is discarded; a
    /// play tying an existing candidate's resulting key is merged (kept once).
    pub fn consider(&mut self, candidate: Move) {
        if candidate.dice_used > self.max_dice_used
            || (candidate.dice_used == self.max_dice_used && candidate.pips_used > self.max_pips_used)
        {
            self.moves.clear();
            self.max_dice_used = candidate.dice_used;
            self.max_pips_used = candidate.pips_used;
            self.moves.push(candidate);
            return;
        }
        if candidate.dice_used < self.max_dice_used
            || (candidate.dice_used == self.max_dice_used && candidate.pips_used < self.max_pips_used)
        {
            return;
        }
        if self.moves.iter().any(|m| m.key == candidate.key) {
            return;
        }
        self.moves.push(candidate);
    }

    /// Record `i` as the new best-scoring candidate if `score` beats the
    /// current best.
    pub fn note_score(&mut self, i: usize, score: f32) {
        if score > self.best_score {
            self.best_score = score;
            self.best_index = Some(i);
        }
    }

    #[must_use]
    pub fn best_index(&self) -> Option<usize> {
        self.best_index
    }

    #[must_use]
    pub fn best(&self) -> Option<&Move> {
        self.best_index.and_then(|i| self.moves.get(i))
    }

    /// Sort candidates by primary score descending, secondary score as
    /// tiebreaker (spec §4.9's tie-breaking rule).
    pub fn sort_by_score(&mut self) {
        self.moves.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.score2.partial_cmp(&a.score2).unwrap_or(std::cmp::Ordering::Equal))
        });
        self.best_index = if self.moves.is_empty() { None } else { Some(0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionKey;

    fn key(n: u32) -> PositionKey {
        PositionKey([n, 0, 0, 0, 0, 0, 0])
    }

    #[test]
    fn a_longer_play_displaces_all_shorter_ones() {
        let mut list = MoveList::new();
        list.consider(Move::unscored(vec![], key(1), 2, 5));
        list.consider(Move::unscored(vec![], key(2), 2, 3));
        assert_eq!(list.len(), 1);
        list.consider(Move::unscored(vec![], key(3), 4, 1));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().key, key(3));
    }

    #[test]
    fn equal_length_heavier_pip_play_wins() {
        let mut list = MoveList::new();
        list.consider(Move::unscored(vec![], key(1), 2, 3));
        list.consider(Move::unscored(vec![], key(2), 2, 7));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().key, key(2));
    }

    #[test]
    fn duplicate_resulting_keys_are_merged() {
        let mut list = MoveList::new();
        list.consider(Move::unscored(vec![], key(5), 2, 4));
        list.consider(Move::unscored(vec![], key(5), 2, 4));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn sanity_clamp_enforces_ordering_relations() {
        let raw = RawOutput { win: 1.2, win_g: 0.9, win_bg: 1.0, lose_g: -0.1, lose_bg: 0.5 };
        let clamped = raw.sanity_clamped();
        assert!(clamped.win <= 1.0 && clamped.win >= 0.0);
        assert!(clamped.win_g <= clamped.win);
        assert!(clamped.win_bg <= clamped.win_g);
        assert!(clamped.lose_g <= 1.0 - clamped.win);
        assert!(clamped.lose_bg <= clamped.lose_g);
    }
}
