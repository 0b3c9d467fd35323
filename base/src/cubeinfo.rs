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

//! Cube state and per-search evaluation settings.

use crate::board::{Player, Variation};

/// Whether the current game is the Crawford game (no doubling allowed) or a
/// post-Crawford game (doubling allowed again, but the MET extension differs).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrawfordState {
    PreCrawford,
    Crawford,
    PostCrawford,
}

/// Who owns the cube: centred (neither side), or one of the two players.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CubeOwner {
    Centered,
    Player(Player),
}

/// The cube and match-score state a cubeful evaluation is computed against.
#[derive(Clone, Copy, Debug)]
pub struct CubeInfo {
    /// Current cube level, as a power of two (1, 2, 4, ...).
    pub cube_value: u32,
    pub owner: CubeOwner,
    /// Side currently on roll.
    pub on_roll: Player,
    /// 0 for money play; otherwise the match length in points.
    pub match_to: u32,
    /// Points already scored by each player.
    pub score: [u32; 2],
    pub crawford: CrawfordState,
    pub jacoby: bool,
    pub beavers: bool,
    pub variation: Variation,
    /// Precomputed `{own-gammon, opp-gammon, own-backgammon, opp-backgammon}`
    /// price quadruple for this cube level and score.
    pub gammon_price: [f32; 4],
}

impl CubeInfo {
    /// A centred-cube money game, no Jacoby, no beavers: the simplest
    /// possible context, useful as a default and in tests.
    #[must_use]
    pub fn money(on_roll: Player, variation: Variation) -> CubeInfo {
        CubeInfo {
            cube_value: 1,
            owner: CubeOwner::Centered,
            on_roll,
            match_to: 0,
            score: [0, 0],
            crawford: CrawfordState::PreCrawford,
            jacoby: false,
            beavers: false,
            variation,
            gammon_price: [1.0, 1.0, 1.0, 1.0],
        }
    }

    #[must_use]
    pub fn is_money_game(&self) -> bool {
        self.match_to == 0
    }
}

/// Search settings for one `find_best_moves` call.
#[derive(Clone, Copy, Debug)]
pub struct EvalContext {
    pub cubeful: bool,
    pub plies: u8,
    pub use_prune: bool,
    pub deterministic: bool,
    /// Standard deviation of per-output Gaussian noise; 0 disables noise.
    pub noise: f32,
}

impl EvalContext {
    #[must_use]
    pub fn new(plies: u8, cubeful: bool) -> EvalContext {
        EvalContext { cubeful, plies, use_prune: true, deterministic: false, noise: 0.0 }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        EvalContext::new(0, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_game_has_no_match_target() {
        let ci = CubeInfo::money(Player::Zero, Variation::Standard);
        assert!(ci.is_money_game());
    }
}
