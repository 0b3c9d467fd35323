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

//! Tuning knobs for the plied search (§4.9) and the caches it reads through.

/// Configuration for one `find_best_moves` call, separate from the per-call
/// [`tavli_base::EvalContext`] since these values rarely change between
/// calls and are normally shared across a whole session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchConfig {
    /// Number of buckets backing the equity cache (rounded down to a power
    /// of two).
    pub equity_cache_size: usize,
    /// Fewest reply candidates a roll needs before the prune net is used to
    /// shortlist them; below this the full net scores every candidate.
    pub min_prune_moves: usize,
    /// Hard ceiling on how many candidates the prune pass keeps, regardless
    /// of `min_prune_moves + floor(log2(n))`.
    pub prune_cap: usize,
    /// Relative equity gap, at the deepest ply, above which the top
    /// candidate is re-scored at full requested depth (§4.9's deep-ply
    /// rescoring invariant).
    pub rescore_gap: f32,
}

impl SearchConfig {
    #[must_use]
    pub fn new() -> SearchConfig {
        SearchConfig {
            equity_cache_size: 1 << 16,
            min_prune_moves: 5,
            prune_cap: 16,
            rescore_gap: 0.04,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> SearchConfig {
        SearchConfig::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_equity_cache_size_is_a_power_of_two() {
        let cfg = SearchConfig::default();
        assert_eq!(cfg.equity_cache_size.count_ones(), 1);
    }
}
