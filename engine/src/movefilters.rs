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

//! Filter-beam presets for the plied search's move pruning (§4.9): per-ply
//! "keep unconditionally / keep a few more within a threshold" settings.

/// One ply's filter: keep `accept` candidates unconditionally (a negative
/// value disables this ply, short-circuiting to the key move only), then
/// extend the kept set by up to `extra` more candidates whose score is
/// within `threshold` of the best.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveFilter {
    pub accept: i8,
    pub extra: u8,
    pub threshold: f32,
}

const fn mf(accept: i8, extra: u8, threshold: f32) -> MoveFilter {
    MoveFilter { accept, extra, threshold }
}

/// The four-ply filter table for one "depth setting": row `d` (0-indexed) is
/// the set of per-ply filters used for a `d+1`-ply search.
pub type FilterTable = [[MoveFilter; 4]; 4];

const NULL: MoveFilter = mf(0, 0, 0.0);

pub const TINY: FilterTable = [
    [mf(0, 5, 0.08), NULL, NULL, NULL],
    [mf(0, 5, 0.08), mf(-1, 0, 0.0), NULL, NULL],
    [mf(0, 5, 0.08), mf(-1, 0, 0.0), mf(0, 2, 0.02), NULL],
    [mf(0, 5, 0.08), mf(-1, 0, 0.0), mf(0, 2, 0.02), mf(-1, 0, 0.0)],
];

pub const NARROW: FilterTable = [
    [mf(0, 8, 0.12), NULL, NULL, NULL],
    [mf(0, 8, 0.12), mf(-1, 0, 0.0), NULL, NULL],
    [mf(0, 8, 0.12), mf(-1, 0, 0.0), mf(0, 2, 0.03), NULL],
    [mf(0, 8, 0.12), mf(-1, 0, 0.0), mf(0, 2, 0.03), mf(-1, 0, 0.0)],
];

pub const NORMAL: FilterTable = [
    [mf(0, 8, 0.16), NULL, NULL, NULL],
    [mf(0, 8, 0.16), mf(-1, 0, 0.0), NULL, NULL],
    [mf(0, 8, 0.16), mf(-1, 0, 0.0), mf(0, 2, 0.04), NULL],
    [mf(0, 8, 0.16), mf(-1, 0, 0.0), mf(0, 2, 0.04), mf(-1, 0, 0.0)],
];

pub const LARGE: FilterTable = [
    [mf(0, 16, 0.32), NULL, NULL, NULL],
    [mf(0, 16, 0.32), mf(-1, 0, 0.0), NULL, NULL],
    [mf(0, 16, 0.32), mf(-1, 0, 0.0), mf(0, 4, 0.08), NULL],
    [mf(0, 16, 0.32), mf(-1, 0, 0.0), mf(0, 4, 0.08), mf(-1, 0, 0.0)],
];

pub const HUGE: FilterTable = [
    [mf(0, 20, 0.44), NULL, NULL, NULL],
    [mf(0, 20, 0.44), mf(-1, 0, 0.0), NULL, NULL],
    [mf(0, 20, 0.44), mf(-1, 0, 0.0), mf(0, 6, 0.11), NULL],
    [mf(0, 20, 0.44), mf(-1, 0, 0.0), mf(0, 6, 0.11), mf(-1, 0, 0.0)],
];

/// Pick the filter row for a `plies`-deep search, clamped to the deepest row
/// this table carries.
#[must_use]
pub fn filters_for_plies(table: &FilterTable, plies: u8) -> &[MoveFilter; 4] {
    let row = (plies.saturating_sub(1) as usize).min(table.len() - 1);
    &table[row]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_one_ply_keeps_up_to_eight_within_point_one_six() {
        let row = filters_for_plies(&NORMAL, 1);
        assert_eq!(row[0], mf(0, 8, 0.16));
        assert_eq!(row[1], NULL);
    }

    #[test]
    fn normal_three_ply_disables_the_second_ply_and_narrows_the_third() {
        let row = filters_for_plies(&NORMAL, 3);
        assert!(row[1].accept < 0, "ply 2 must be disabled");
        assert_eq!(row[2], mf(0, 2, 0.04));
    }

    #[test]
    fn plies_deeper_than_the_table_clamp_to_the_last_row() {
        let row = filters_for_plies(&TINY, 9);
        assert_eq!(*row, TINY[3]);
    }
}
