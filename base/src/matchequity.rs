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

//! The match-equity table: how likely the player `i`-away is to win the
//! match against a player `j`-away, loaded from an explicit XML table and
//! extrapolated past its declared size.
//!
//! Also derives, from the MET, the gammon-price quadruples the cube-equity
//! math in `tavli_engine::cube` consumes.

use crate::error::EngineError;

/// Largest away-score the table (explicit or extrapolated) covers.
pub const MAX_SCORE: usize = 64;
const GAMMON_RATE: f32 = 0.25;

/// Standard deviations of game-count distributions by away-score, index 0
/// unused. Used to extrapolate equities beyond the table's explicit entries.
const STDDEV_TABLE: [f32; 12] =
    [0.0, 1.24, 1.27, 1.47, 1.50, 1.60, 1.61, 1.66, 1.68, 1.70, 1.72, 1.77];

fn stddev_for(away: usize) -> f32 {
    STDDEV_TABLE[away.clamp(1, STDDEV_TABLE.len() - 1)]
}

/// Abramowitz-Stegun approximation of the standard normal CDF, used to
/// extrapolate match equities past the table's declared size the same way
/// the source's `normalDistArea` does (spec §4.6).
fn normal_cdf(x: f32) -> f32 {
    let t = 1.0 / (1.0 + 0.231_641_9 * x.abs());
    let poly = t
        * (0.319_381_530
            + t * (-0.356_563_782 + t * (1.781_477_937 + t * (-1.821_255_978 + t * 1.330_274_429))));
    let pdf = (-x * x / 2.0).exp() / (2.0 * std::f32::consts::PI).sqrt();
    let upper_tail = pdf * poly;
    if x >= 0.0 {
        1.0 - upper_tail
    } else {
        upper_tail
    }
}

/// A match-equity table: `pre_crawford[i][j]` is the equity of the player `i`
/// games away against an opponent `j` games away, not in the Crawford game.
/// `post_crawford[p][j]` is the one-row table for the player who just lost
/// the Crawford game (`p`), at 1-away, against an opponent `j` away.
#[derive(Clone, Debug)]
pub struct MatchEquityTable {
    pre_crawford: Vec<Vec<f32>>,
    post_crawford: [Vec<f32>; 2],
}

impl MatchEquityTable {
    /// Parse an explicit MET from XML text. Only explicit
    /// (`<pre-crawford-table>`/`<post-crawford-table>` of literal numbers)
    /// tables are supported; parameterized ("Zadeh formula") tables are a
    /// documented open question the source itself never finished (spec §9)
    /// and are rejected here as a format error.
    pub fn load(xml: &str) -> Result<MatchEquityTable, EngineError> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| EngineError::FormatInvalid { detail: e.to_string() })?;
        let root = doc.root_element();

        let pre_node = root
            .descendants()
            .find(|n| n.has_tag_name("pre-crawford-table"))
            .ok_or_else(|| EngineError::FormatInvalid {
                detail: "missing pre-crawford-table".into(),
            })?;
        if let Some(kind) = pre_node.attribute("type") {
            if kind != "explicit" {
                return Err(EngineError::FormatInvalid {
                    detail: format!("unsupported match-equity table kind: {kind}"),
                });
            }
        }
        let mut pre_crawford = parse_rows(pre_node)?;

        let post_nodes: Vec<_> = root
            .descendants()
            .filter(|n| n.has_tag_name("post-crawford-table"))
            .collect();
        let mut post_crawford = [Vec::new(), Vec::new()];
        match post_nodes.len() {
            1 => {
                let row = parse_single_row(post_nodes[0])?;
                post_crawford = [row.clone(), row];
            }
            2 => {
                for node in &post_nodes {
                    let player: usize = match node.attribute("player") {
                        Some("0") | None => 0,
                        _ => 1,
                    };
                    post_crawford[player] = parse_single_row(node)?;
                }
            }
            _ => {
                return Err(EngineError::FormatInvalid {
                    detail: "expected one or two post-crawford-table entries".into(),
                })
            }
        }

        extend(&mut pre_crawford, &mut post_crawford);
        Ok(MatchEquityTable { pre_crawford, post_crawford })
    }

    /// Pre-Crawford match equity of the player `away_me` games away against
    /// an opponent `away_them` games away.
    #[must_use]
    pub fn pre_crawford(&self, away_me: usize, away_them: usize) -> f32 {
        let i = away_me.clamp(1, MAX_SCORE) - 1;
        let j = away_them.clamp(1, MAX_SCORE) - 1;
        self.pre_crawford[i][j]
    }

    /// Post-Crawford match equity for the player at 1-away who is `player`
    /// (0 or 1, used only to pick which of the two post-Crawford rows
    /// applies when they differ) against an opponent `away_them` games away.
    #[must_use]
    pub fn post_crawford(&self, player: usize, away_them: usize) -> f32 {
        let j = away_them.clamp(1, MAX_SCORE) - 1;
        self.post_crawford[player & 1][j]
    }
}

fn parse_rows(node: roxmltree::Node) -> Result<Vec<Vec<f32>>, EngineError> {
    let mut rows = Vec::new();
    for row_node in node.children().filter(|n| n.is_element()) {
        rows.push(parse_single_row(row_node)?);
    }
    if rows.is_empty() {
        return Err(EngineError::FormatInvalid { detail: "empty pre-crawford-table".into() });
    }
    Ok(rows)
}

fn parse_single_row(node: roxmltree::Node) -> Result<Vec<f32>, EngineError> {
    let text = node.text().unwrap_or_default();
    text.split_whitespace()
        .map(|tok| tok.parse::<f32>().map_err(EngineError::from))
        .collect()
}

/// Extend both tables out to [`MAX_SCORE`] using a normal-distribution
/// approximation of "probability the trailer overtakes the leader",
/// averaging the two sides' game-count stddevs and scaling by `sqrt(games)`
/// (spec §4.6). This is an approximation of the source's `extendMET`, not a
/// bit-exact port: see DESIGN.md for the grounding note.
fn extend(pre_crawford: &mut Vec<Vec<f32>>, post_crawford: &mut [Vec<f32>; 2]) {
    let declared = pre_crawford.len();
    for row in pre_crawford.iter_mut() {
        row.resize(declared.max(row.len()), 0.0);
    }
    pre_crawford.resize(MAX_SCORE, Vec::new());
    for i in 0..MAX_SCORE {
        if pre_crawford[i].len() < MAX_SCORE {
            let existing_len = pre_crawford[i].len();
            let mut row = std::mem::take(&mut pre_crawford[i]);
            row.resize(MAX_SCORE, 0.0);
            for j in existing_len.max(1)..MAX_SCORE {
                if i < existing_len && j < existing_len {
                    continue;
                }
                row[j] = extrapolated_equity(i + 1, j + 1);
            }
            pre_crawford[i] = row;
        }
    }
    for p in 0..2 {
        let existing_len = post_crawford[p].len();
        post_crawford[p].resize(MAX_SCORE, 0.0);
        for j in existing_len..MAX_SCORE {
            post_crawford[p][j] = post_crawford_equity(j + 1);
        }
    }
}

fn extrapolated_equity(away_me: usize, away_them: usize) -> f32 {
    let sigma_me = stddev_for(away_me);
    let sigma_them = stddev_for(away_them);
    let games = ((away_me + away_them) as f32 / 2.0).max(1.0);
    let sigma = ((sigma_me + sigma_them) / 2.0) * games.sqrt();
    let diff = away_them as f32 - away_me as f32;
    normal_cdf(diff / sigma.max(1e-6))
}

/// Post-Crawford equity recurrence: the post-Crawford leader wins the match
/// unless the trailer closes the gap via a gammon, so the gammon rate
/// directly discounts the halving term, with small free-drop adjustments at
/// the two- and four-away opponent scores (spec §4.6).
fn post_crawford_equity(away_them: usize) -> f32 {
    let mut equity = 1.0 - (1.0 - GAMMON_RATE) * 0.5f32.powi(away_them as i32 - 1);
    if away_them == 2 {
        equity -= 0.015;
    }
    if away_them == 4 {
        equity -= 0.004;
    }
    equity.clamp(0.0, 1.0)
}

/// Gammon-price quadruple `{own-gammon, opp-gammon, own-backgammon,
/// opp-backgammon}` at a given cube level and score, derived from the MET
/// entries at the resulting scores for win/win-gammon/win-backgammon and
/// lose/lose-gammon/lose-backgammon (spec §4.6).
#[must_use]
pub fn gammon_prices(
    met: &MatchEquityTable,
    match_to: u32,
    score: [u32; 2],
    player: usize,
    cube_value: u32,
    post_crawford: bool,
) -> [f32; 4] {
    if match_to == 0 {
        // Money play: gammon price is symmetric and independent of the MET.
        return [1.0, 1.0, 1.0, 1.0];
    }
    let away_me = match_to.saturating_sub(score[player]).max(1) as usize;
    let away_opp = match_to.saturating_sub(score[1 - player]).max(1) as usize;

    let equity_at = |my_away: usize, opp_away: usize| -> f32 {
        if post_crawford {
            met.post_crawford(player, opp_away)
        } else {
            met.pre_crawford(my_away, opp_away)
        }
    };

    let win = equity_at(away_me.saturating_sub(cube_value as usize).max(1), away_opp);
    let win_g = equity_at(away_me.saturating_sub(2 * cube_value as usize).max(1), away_opp);
    let win_bg = equity_at(away_me.saturating_sub(3 * cube_value as usize).max(1), away_opp);
    let lose = equity_at(away_me, away_opp.saturating_sub(cube_value as usize).max(1));
    let lose_g = equity_at(away_me, away_opp.saturating_sub(2 * cube_value as usize).max(1));
    let lose_bg = equity_at(away_me, away_opp.saturating_sub(3 * cube_value as usize).max(1));

    [win_g - win, lose - lose_g, win_bg - win_g, lose_g - lose_bg]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_xml() -> &'static str {
        r#"<match-equity-table>
            <info>toy</info>
            <pre-crawford-table type="explicit">
                <row>0.5 0.7</row>
                <row>0.3 0.5</row>
            </pre-crawford-table>
            <post-crawford-table>
                <row>0.5 0.8</row>
            </post-crawford-table>
        </match-equity-table>"#
    }

    #[test]
    fn loads_explicit_rows_verbatim() {
        let met = MatchEquityTable::load(toy_xml()).unwrap();
        assert!((met.pre_crawford(1, 1) - 0.5).abs() < 1e-6);
        assert!((met.pre_crawford(1, 2) - 0.7).abs() < 1e-6);
        assert!((met.pre_crawford(2, 1) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn extrapolated_entries_are_in_unit_range() {
        let met = MatchEquityTable::load(toy_xml()).unwrap();
        for i in 1..=MAX_SCORE {
            for j in 1..=MAX_SCORE {
                let e = met.pre_crawford(i, j);
                assert!((0.0..=1.0).contains(&e), "entry ({i},{j}) out of range: {e}");
            }
        }
    }

    #[test]
    fn rejects_non_explicit_tables() {
        let xml = r#"<met><pre-crawford-table type="zadeh"><row>0.5</row></pre-crawford-table>
            <post-crawford-table><row>0.5</row></post-crawford-table></met>"#;
        assert!(MatchEquityTable::load(xml).is_err());
    }

    #[test]
    fn normal_cdf_is_one_half_at_zero() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-3);
    }
}
