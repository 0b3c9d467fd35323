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

//! The public facade (§6): `Engine::init` loads the reference tables once;
//! `Engine::find_best_moves` is the one operation everything else is built
//! to serve.

use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

use tavli_base::matchequity::MatchEquityTable;
use tavli_base::{generate_moves, Board, CubeInfo, Dice, EngineError, EvalContext, MoveList, Player, Variation};

pub mod bearoff;
pub mod cache;
pub mod config;
pub mod cube;
pub mod evaluate;
pub mod inputs;
pub mod movefilters;
pub mod neuralnet;
pub mod search;

use bearoff::BearoffTables;
use cache::EquityCache;
use config::SearchConfig;
use neuralnet::NetworkFamily;
use search::SearchResources;

fn load_optional_met(path: &Path) -> Option<MatchEquityTable> {
    let xml = std::fs::read_to_string(path).ok()?;
    match MatchEquityTable::load(&xml) {
        Ok(met) => Some(met),
        Err(e) => {
            eprintln!("tavli: failed to parse match-equity table at {}: {e}, continuing without one", path.display());
            None
        }
    }
}

/// A loaded engine: read-only reference tables plus the per-call scratch
/// state (equity cache). `find_best_moves` takes `&self`; the cache is the
/// only interior-mutable part. A multi-threaded caller should construct one
/// `Engine` per thread and share only the `Arc`-wrapped tables between them,
/// by cloning the `Arc` fields into each `Engine::init` result rather than
/// sharing a single `Engine` value (see DESIGN.md).
pub struct Engine {
    nets: Arc<NetworkFamily>,
    bearoff: Arc<BearoffTables>,
    met: Option<Arc<MatchEquityTable>>,
    config: SearchConfig,
    /// Default variation new calls use; callers that analyze more than one
    /// variation in one process should set this before each call.
    pub variation: Variation,
    /// Cube/match state for scoring. `on_roll` is overwritten per call from
    /// `find_best_moves`'s `player` argument; the remaining fields persist
    /// across calls until the caller changes them.
    pub cube: CubeInfo,
    pub plies: u8,
    pub use_prune: bool,
    pub deterministic: bool,
    pub noise: f32,
    cache: RefCell<EquityCache>,
}

impl Engine {
    /// Load the six reference files from `data_dir` (§6). The one-sided
    /// bearoff database is required; the two-sided, hypergammon and
    /// match-equity files degrade gracefully when absent or malformed.
    pub fn init(data_dir: &Path) -> Result<Engine, EngineError> {
        let nets = neuralnet::load_weights_file(&data_dir.join("gnubg.weights"))?;
        let bearoff = BearoffTables::load(data_dir)?;
        let met = load_optional_met(&data_dir.join("met/Kazaross-XG2.xml"));
        let config = SearchConfig::default();
        let cache = RefCell::new(EquityCache::with_size(config.equity_cache_size));

        Ok(Engine {
            nets: Arc::new(nets),
            bearoff: Arc::new(bearoff),
            met: met.map(Arc::new),
            config,
            variation: Variation::Standard,
            cube: CubeInfo::money(Player::Zero, Variation::Standard),
            plies: 0,
            use_prune: true,
            deterministic: false,
            noise: 0.0,
            cache,
        })
    }

    /// Enumerate (and, if `score_moves`, score) every legal play of `dice`
    /// for `player` on `board`. `board` is given in raw `[[side 0], [side
    /// 1]]` form, not pre-rotated; this method rotates internally so the
    /// generator and evaluator always see the mover as `Player::Zero`.
    /// Returns an empty list exactly when `player` has no legal play.
    pub fn find_best_moves(
        &self,
        board: &Board,
        dice: Dice,
        player: Player,
        score_moves: bool,
        cubeful: bool,
    ) -> Result<MoveList, EngineError> {
        let canonical = match player {
            Player::Zero => *board,
            Player::One => board.swap_sides(),
        };
        let mut list = generate_moves(&canonical, dice, Player::Zero);
        if !score_moves || list.is_empty() {
            return Ok(list);
        }

        let mut cube_info = self.cube;
        cube_info.on_roll = player;
        cube_info.variation = self.variation;

        let ctx = EvalContext {
            cubeful,
            plies: self.plies,
            use_prune: self.use_prune,
            deterministic: self.deterministic,
            noise: self.noise,
        };
        let res = SearchResources {
            nets: &self.nets,
            bearoff: &self.bearoff,
            met: self.met.as_deref(),
            config: &self.config,
        };
        let mut cache = self.cache.borrow_mut();
        search::score_moves(&mut list, self.variation, &cube_info, &ctx, &res, &mut cache)?;
        Ok(list)
    }

    /// Drop every cached evaluation without reloading the reference tables.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Explicit RAII release, named only because the facade names it (§6);
    /// letting the value go out of scope does the same thing.
    pub fn shutdown(self) {}

    /// An engine backed by zero-weight networks and an empty bearoff
    /// database, for tests that exercise move generation, classification and
    /// the search plumbing without a real `gnubg.weights`/`.bd` data
    /// directory on disk. Positions whose outcome doesn't depend on the net
    /// (forced wins/losses, the `PositionKey` round trip) still score
    /// correctly under it; positions that do reach the net only get the
    /// constant 0.5-ish output a zero-weight network produces everywhere.
    #[must_use]
    pub fn for_testing() -> Engine {
        Engine {
            nets: Arc::new(neuralnet::zero_family()),
            bearoff: Arc::new(bearoff::empty_bearoff_tables_for_test()),
            met: None,
            config: SearchConfig::default(),
            variation: Variation::Standard,
            cube: CubeInfo::money(Player::Zero, Variation::Standard),
            plies: 0,
            use_prune: true,
            deterministic: true,
            noise: 0.0,
            cache: RefCell::new(EquityCache::with_size(1024)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavli_base::{Board, Dice as D};

    #[test]
    fn forced_bearoff_scenario_returns_exactly_one_move() {
        let engine = Engine::for_testing();
        let mut board = Board::empty();
        board[(Player::Zero, 0)] = 1;
        board[(Player::One, 1)] = 1;
        let list = engine.find_best_moves(&board, D::new(6, 1), Player::Zero, true, false).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.best().unwrap().output.win, 1.0);
    }

    #[test]
    fn unscored_call_still_enumerates_moves() {
        let engine = Engine::for_testing();
        let board = Board::starting(Variation::Standard);
        let list = engine.find_best_moves(&board, D::new(3, 1), Player::Zero, false, false).unwrap();
        assert!(!list.is_empty());
        assert_eq!(list.best_index(), None, "unscored lists never populate a best index");
    }

    #[test]
    fn player_one_is_rotated_before_generation() {
        let engine = Engine::for_testing();
        let mut board = Board::empty();
        board[(Player::One, 0)] = 1;
        board[(Player::One, 23)] = 14;
        board[(Player::Zero, 1)] = 1;
        let list = engine.find_best_moves(&board, D::new(6, 1), Player::One, false, false).unwrap();
        assert!(!list.is_empty());
    }
}
