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

//! Cubeless-to-cubeful equity conversion: the Janowski interpolation between
//! a dead-cube and a live-cube utility (§4.6).

use tavli_base::matchequity::MatchEquityTable;
use tavli_base::{CrawfordState, CubeInfo, CubeOwner, PositionClass, RawOutput};

const RACE_FACTOR_X: f32 = 0.001_25;
const RACE_COEFFICIENT_X: f32 = 0.55;
const RACE_MAX: f32 = 0.7;
const RACE_MIN: f32 = 0.6;
const CONTACT_X: f32 = 0.68;
const CRASHED_X: f32 = 0.68;
const TS_CUBE_X: f32 = 0.6;
const OS_CUBE_X: f32 = 0.6;

/// Cubeless "correct" equity for `output` under the gammon prices already
/// baked into `cube` (own/opp gammon and backgammon price quadruple).
#[must_use]
pub fn utility(output: &RawOutput, cube: &CubeInfo) -> f32 {
    let [own_g, opp_g, own_bg, opp_bg] = cube.gammon_price;
    (output.win * 2.0 - 1.0) + output.win_g * own_g - output.lose_g * opp_g + output.win_bg * own_bg
        - output.lose_bg * opp_bg
}

/// Money equity (gammon price fixed at 1) for money play; identical to
/// [`utility`] for match play, where the gammon price already reflects the
/// MET-derived value of a gammon at this score.
#[must_use]
pub fn utility_me(output: &RawOutput, cube: &CubeInfo) -> f32 {
    if cube.is_money_game() {
        (output.win * 2.0 - 1.0) + (output.win_g - output.lose_g) + (output.win_bg - output.lose_bg)
    } else {
        utility(output, cube)
    }
}

/// Cube efficiency `x` for a leaf's position class: how much of the gap
/// between dead-cube and live-cube utility the cube actually captures.
#[must_use]
pub fn cube_efficiency(class: PositionClass, opponent_pip_count: u32) -> f32 {
    match class {
        PositionClass::Over => 0.0,
        PositionClass::Hypergammon1 | PositionClass::Hypergammon2 | PositionClass::Hypergammon3 => 0.60,
        PositionClass::Bearoff1 | PositionClass::BearoffOneSidedDisk => OS_CUBE_X,
        PositionClass::Race => {
            let eff = opponent_pip_count as f32 * RACE_FACTOR_X + RACE_COEFFICIENT_X;
            eff.clamp(RACE_MIN, RACE_MAX)
        }
        PositionClass::Contact => CONTACT_X,
        PositionClass::Crashed => CRASHED_X,
        PositionClass::Bearoff2 | PositionClass::BearoffTwoSidedDisk => TS_CUBE_X,
    }
}

/// Money-play live-cube utility, a three-segment piecewise-linear function of
/// `p = P(win)` joining the take point, the cash point, and the gammon/
/// backgammon-inflated extremes. `w`/`l` are the average win/loss multiples
/// (`1 + (gammon+backgammon rate)`); the three branches correspond to a
/// centred, player-owned, or opponent-owned cube.
#[must_use]
pub fn money_live(w: f32, l: f32, p: f32, cube: &CubeInfo) -> f32 {
    match cube.owner {
        CubeOwner::Centered => {
            let take_point = (l - 0.5) / (w + l + 0.5);
            let cash_point = (l + 1.0) / (w + l + 0.5);
            if p < take_point {
                if cube.jacoby {
                    -1.0
                } else {
                    -l + (-1.0 + l) * p / take_point
                }
            } else if p < cash_point {
                -1.0 + 2.0 * (p - take_point) / (cash_point - take_point)
            } else if cube.jacoby {
                1.0
            } else {
                1.0 + (w - 1.0) * (p - cash_point) / (1.0 - cash_point)
            }
        }
        CubeOwner::Player(owner) if owner == cube.on_roll => {
            let cash_point = (l + 1.0) / (w + l + 0.5);
            if p < cash_point {
                -l + (1.0 + l) * p / cash_point
            } else {
                1.0 + (w - 1.0) * (p - cash_point) / (1.0 - cash_point)
            }
        }
        CubeOwner::Player(_) => {
            let take_point = (l - 0.5) / (w + l + 0.5);
            if p < take_point {
                -l + (-1.0 + l) * p / take_point
            } else {
                -1.0 + (w + 1.0) * (p - take_point) / (1.0 - take_point)
            }
        }
    }
}

fn win_loss_multiples(output: &RawOutput) -> Option<(f32, f32)> {
    const EPS: f32 = 1e-7;
    if output.win <= EPS || output.win >= 1.0 - EPS {
        return None;
    }
    let w = 1.0 + (output.win_g + output.win_bg) / output.win;
    let l = 1.0 + (output.lose_g + output.lose_bg) / (1.0 - output.win);
    Some((w, l))
}

/// Cubeful equity for a money-play leaf: `(1-x)*dead + x*live`, `x` the cube
/// efficiency of `class`.
#[must_use]
pub fn money_cubeful_equity(output: &RawOutput, cube: &CubeInfo, class: PositionClass, opponent_pip_count: u32) -> f32 {
    let dead = utility_me(output, cube);
    let Some((w, l)) = win_loss_multiples(output) else {
        return dead;
    };
    let x = cube_efficiency(class, opponent_pip_count);
    let live = money_live(w, l, output.win, cube);
    dead * (1.0 - x) + live * x
}

fn away(cube: &CubeInfo) -> (usize, usize) {
    let me = cube.on_roll.index();
    let them = cube.on_roll.other().index();
    let away_me = cube.match_to.saturating_sub(cube.score[me]).max(1) as usize;
    let away_them = cube.match_to.saturating_sub(cube.score[them]).max(1) as usize;
    (away_me, away_them)
}

fn mwc_at(met: &MatchEquityTable, cube: &CubeInfo, my_extra_away: i64, their_extra_away: i64) -> f32 {
    let (away_me, away_them) = away(cube);
    let me = (away_me as i64 - my_extra_away).max(1) as usize;
    let them = (away_them as i64 - their_extra_away).max(1) as usize;
    match cube.crawford {
        CrawfordState::PostCrawford => met.post_crawford(0, them),
        _ => met.pre_crawford(me, them),
    }
}

/// Convert cubeless equity to match-winning-chance via linear
/// interpolation/extrapolation between the MET entries for "I win 1 point"
/// and "I lose 1 point" (the inverse of [`mwc_to_equity`]).
#[must_use]
pub fn equity_to_mwc(equity: f32, met: &MatchEquityTable, cube: &CubeInfo) -> f32 {
    let cube_value = cube.cube_value as i64;
    let mwc_win = mwc_at(met, cube, cube_value, 0);
    let mwc_lose = mwc_at(met, cube, 0, cube_value);
    0.5 * (equity * (mwc_win - mwc_lose) + (mwc_win + mwc_lose))
}

/// Inverse of [`equity_to_mwc`]: recover an equity value from a match-winning
/// chance.
#[must_use]
pub fn mwc_to_equity(mwc: f32, met: &MatchEquityTable, cube: &CubeInfo) -> f32 {
    let cube_value = cube.cube_value as i64;
    let mwc_win = mwc_at(met, cube, cube_value, 0);
    let mwc_lose = mwc_at(met, cube, 0, cube_value);
    let denom = mwc_win - mwc_lose;
    if denom.abs() < 1e-9 {
        0.0
    } else {
        (2.0 * mwc - (mwc_win + mwc_lose)) / denom
    }
}

/// Match-play cubeful equity, expressed directly as a match-winning chance:
/// the dead-cube MWC (from [`utility`] mapped through the MET) blended with a
/// live-cube MWC, built by the same take-point/cash-point piecewise
/// construction as [`money_live`] but with the `-l/-1/+1/+w` equity
/// landmarks replaced by MET lookups at the corresponding resulting scores
/// (§4.6; see DESIGN.md for why this replaces the source's doubling-window
/// cash-point search with this simpler piecewise form).
#[must_use]
pub fn match_cubeful_mwc(
    output: &RawOutput,
    cube: &CubeInfo,
    met: &MatchEquityTable,
    class: PositionClass,
    opponent_pip_count: u32,
) -> f32 {
    let dead_mwc = equity_to_mwc(utility(output, cube), met, cube);
    let Some((w, l)) = win_loss_multiples(output) else {
        return dead_mwc;
    };

    let cube_value = cube.cube_value as i64;
    let cash_mwc = mwc_at(met, cube, cube_value, 0);
    let opp_cash_mwc = mwc_at(met, cube, 0, cube_value);
    let gammon_win_mwc = mwc_at(met, cube, 2 * cube_value, 0);
    let backgammon_win_mwc = mwc_at(met, cube, 3 * cube_value, 0);
    let gammon_lose_mwc = mwc_at(met, cube, 0, 2 * cube_value);
    let backgammon_lose_mwc = mwc_at(met, cube, 0, 3 * cube_value);

    let p = output.win;
    let (rg0, rbg0) = ((output.win_g - output.win_bg) / output.win, output.win_bg / output.win);
    let (rg1, rbg1) =
        ((output.lose_g - output.lose_bg) / (1.0 - output.win), output.lose_bg / (1.0 - output.win));
    // MWC analogues of money_live's `-l` (lose, gammon-weighted) and `+w`
    // (win, gammon-weighted) landmarks.
    let lose_weighted_mwc = (1.0 - rg1 - rbg1) * opp_cash_mwc + rg1 * gammon_lose_mwc + rbg1 * backgammon_lose_mwc;
    let win_weighted_mwc = (1.0 - rg0 - rbg0) * cash_mwc + rg0 * gammon_win_mwc + rbg0 * backgammon_win_mwc;

    let live_mwc = match cube.owner {
        CubeOwner::Centered => {
            let take_point = (l - 0.5) / (w + l + 0.5);
            let cash_point = (l + 1.0) / (w + l + 0.5);
            if p < take_point {
                lose_weighted_mwc + (opp_cash_mwc - lose_weighted_mwc) * p / take_point
            } else if p < cash_point {
                opp_cash_mwc + (cash_mwc - opp_cash_mwc) * (p - take_point) / (cash_point - take_point)
            } else {
                cash_mwc + (win_weighted_mwc - cash_mwc) * (p - cash_point) / (1.0 - cash_point)
            }
        }
        CubeOwner::Player(owner) if owner == cube.on_roll => {
            let cash_point = (l + 1.0) / (w + l + 0.5);
            if p < cash_point {
                lose_weighted_mwc + (cash_mwc - lose_weighted_mwc) * p / cash_point
            } else {
                cash_mwc + (win_weighted_mwc - cash_mwc) * (p - cash_point) / (1.0 - cash_point)
            }
        }
        CubeOwner::Player(_) => {
            let take_point = (l - 0.5) / (w + l + 0.5);
            if p < take_point {
                lose_weighted_mwc + (opp_cash_mwc - lose_weighted_mwc) * p / take_point
            } else {
                opp_cash_mwc + (win_weighted_mwc - opp_cash_mwc) * (p - take_point) / (1.0 - take_point)
            }
        }
    };

    let x = cube_efficiency(class, opponent_pip_count);
    dead_mwc * (1.0 - x) + live_mwc * x
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavli_base::Player;

    fn toy_met() -> MatchEquityTable {
        let xml = r#"<met>
            <pre-crawford-table type="explicit">
                <row>0.50 0.70 0.85</row>
                <row>0.30 0.50 0.70</row>
                <row>0.15 0.30 0.50</row>
            </pre-crawford-table>
            <post-crawford-table>
                <row>0.50 0.80 0.95</row>
            </post-crawford-table>
        </met>"#;
        MatchEquityTable::load(xml).unwrap()
    }

    #[test]
    fn money_utility_matches_raw_win_probability_with_no_gammons() {
        let cube = CubeInfo::money(Player::Zero, tavli_base::Variation::Standard);
        let output = RawOutput { win: 0.75, win_g: 0.0, win_bg: 0.0, lose_g: 0.0, lose_bg: 0.0 };
        let u = utility_me(&output, &cube);
        assert!((u - 0.5).abs() < 1e-6);
    }

    #[test]
    fn money_live_is_minus_one_at_zero_win_probability_for_a_centered_cube() {
        let cube = CubeInfo::money(Player::Zero, tavli_base::Variation::Standard);
        let live = money_live(1.0, 1.0, 0.0, &cube);
        assert!((live + 1.0).abs() < 1e-5);
    }

    #[test]
    fn money_cubeful_equity_falls_back_to_dead_cube_when_win_is_certain() {
        let cube = CubeInfo::money(Player::Zero, tavli_base::Variation::Standard);
        let output = RawOutput { win: 1.0, win_g: 0.0, win_bg: 0.0, lose_g: 0.0, lose_bg: 0.0 };
        let eq = money_cubeful_equity(&output, &cube, PositionClass::Contact, 80);
        assert!((eq - 1.0).abs() < 1e-5);
    }

    #[test]
    fn match_cubeful_mwc_is_between_the_win_and_lose_mwc_endpoints() {
        let met = toy_met();
        let mut cube = CubeInfo::money(Player::Zero, tavli_base::Variation::Standard);
        cube.match_to = 5;
        cube.score = [2, 1];
        cube.gammon_price =
            tavli_base::matchequity::gammon_prices(&met, cube.match_to, cube.score, 0, cube.cube_value, false);
        let output = RawOutput { win: 0.55, win_g: 0.1, win_bg: 0.0, lose_g: 0.05, lose_bg: 0.0 };
        let mwc = match_cubeful_mwc(&output, &cube, &met, PositionClass::Race, 90);
        assert!((0.0..=1.0).contains(&mwc), "mwc out of range: {mwc}");
    }
}
