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

//! The plied dice-averaging search (§4.9): score every candidate in a
//! [`MoveList`] by recursively averaging the opponent's best reply over the
//! 21 weighted dice rolls, then converting the resulting cubeless
//! probabilities to an equity.
//!
//! The board handed to [`score_moves`] is always in the mover's own
//! perspective (`Player::Zero`); [`Board::swap_sides`] is used throughout to
//! step between a position and "the same position, from the other side's
//! point of view" as the recursion alternates turns.

use tavli_base::matchequity::MatchEquityTable;
use tavli_base::{
    classify, generate_moves, ALL_ROLLS, BearoffAvailability, Board, CubeInfo, Dice, EvalContext,
    MoveList, Player, PositionClass, PositionKey, RawOutput, Variation,
};

use crate::bearoff::BearoffTables;
use crate::cache::{CacheKey, CachedPayload, EquityCache};
use crate::config::SearchConfig;
use crate::cube;
use crate::evaluate::{self, EvalResources};
use crate::movefilters::{self, MoveFilter};
use crate::neuralnet::NetworkFamily;

/// Everything a search call reads from but never mutates.
pub struct SearchResources<'a> {
    pub nets: &'a NetworkFamily,
    pub bearoff: &'a BearoffTables,
    pub met: Option<&'a MatchEquityTable>,
    pub config: &'a SearchConfig,
}

fn eval_resources<'a>(res: &SearchResources<'a>) -> EvalResources<'a> {
    EvalResources { nets: res.nets, bearoff: res.bearoff }
}

/// `*_memory` reflects the compressed `*0.bd` databases (small, always
/// loaded); `*_disk` reflects the optional exhaustive `gnubg_os.bd`/
/// `gnubg_ts.bd` pair, named for the source's on-disk (uncompressed, not
/// memory-resident) storage of the larger tables.
fn availability(board: &Board, res: &SearchResources) -> BearoffAvailability {
    if !board.all_home(Player::Zero) || !board.all_home(Player::One) {
        return BearoffAvailability::default();
    }
    let fits = |chequers: u8| {
        board.on_board(Player::Zero) <= u32::from(chequers) && board.on_board(Player::One) <= u32::from(chequers)
    };
    BearoffAvailability {
        two_sided_memory: res.bearoff.two_sided.as_ref().is_some_and(|db| fits(db.chequers())),
        two_sided_disk: res.bearoff.two_sided_full.as_ref().is_some_and(|db| fits(db.chequers())),
        one_sided_memory: fits(res.bearoff.one_sided.chequers()),
        one_sided_disk: res.bearoff.one_sided_full.as_ref().is_some_and(|db| fits(db.chequers())),
    }
}

fn classify_board(board: &Board, variation: Variation, res: &SearchResources) -> PositionClass {
    classify(board, variation, availability(board, res))
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    for &b in bytes {
        h ^= u64::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// A central-limit approximation to a standard Gaussian: the sum of twelve
/// uniform `[0,1)` draws, minus six, from a hash seed walked forward with a
/// linear congruential step. Deterministic in `key` and `output_index`, so
/// two evaluations of the same position under the same settings agree.
fn deterministic_gaussian(key: &PositionKey, output_index: u8) -> f32 {
    let mut bytes = Vec::with_capacity(29);
    for word in key.0 {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes.push(output_index);
    let mut h = fnv1a(&bytes);
    let mut sum = 0.0f32;
    for _ in 0..12 {
        h = h.wrapping_mul(0x5DEE_CE66_D_u64).wrapping_add(0xB);
        sum += (h >> 11) as f32 / (1u64 << 53) as f32;
    }
    sum - 6.0
}

fn box_muller_gaussian() -> f32 {
    let u1 = fastrand::f32().max(1e-9);
    let u2 = fastrand::f32();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

/// Perturb each of the five raw outputs by independent Gaussian noise, scaled
/// down for the rarer gammon and backgammon components, then re-clamp.
fn apply_noise(raw: RawOutput, key: &PositionKey, ctx: &EvalContext) -> RawOutput {
    if ctx.noise <= 0.0 {
        return raw;
    }
    const SCALES: [f32; 5] = [1.0, 0.25, 0.01, 0.25, 0.01];
    let mut values = [raw.win, raw.win_g, raw.win_bg, raw.lose_g, raw.lose_bg];
    for (i, v) in values.iter_mut().enumerate() {
        let z = if ctx.deterministic { deterministic_gaussian(key, i as u8) } else { box_muller_gaussian() };
        *v += z * ctx.noise * SCALES[i];
    }
    RawOutput { win: values[0], win_g: values[1], win_bg: values[2], lose_g: values[3], lose_bg: values[4] }
        .sanity_clamped()
}

/// Cache-backed static evaluation of `board` (mover's own perspective) at
/// zero plies, with noise applied.
fn leaf_value(
    board: &Board,
    variation: Variation,
    ctx: &EvalContext,
    res: &SearchResources,
    cache: &mut EquityCache,
    context_bits: u32,
) -> Result<RawOutput, tavli_base::EngineError> {
    let key = PositionKey::from_board(board);
    let cache_key = CacheKey { position: key, context_bits };
    if let Some(payload) = cache.get(&cache_key) {
        return Ok(payload.output());
    }
    let class = classify_board(board, variation, res);
    let raw = apply_noise(evaluate::static_evaluate(board, class, variation, &eval_resources(res))?, &key, ctx);
    cache.add(cache_key, CachedPayload::new(raw, 0.0));
    Ok(raw)
}

/// Value of `board_after_move` (still in the mover's own perspective) to that
/// mover: swap to the next roller's perspective, evaluate at zero plies, and
/// flip the result back.
fn value_after_move(
    board_after_move: &Board,
    variation: Variation,
    ctx: &EvalContext,
    res: &SearchResources,
    cache: &mut EquityCache,
    context_bits: u32,
) -> Result<RawOutput, tavli_base::EngineError> {
    let next = board_after_move.swap_sides();
    Ok(leaf_value(&next, variation, ctx, res, cache, context_bits)?.flipped())
}

fn prune_score(board_after_move: &Board, class: PositionClass, res: &SearchResources) -> f32 {
    let input = crate::inputs::prune_inputs(board_after_move);
    let net = match class {
        PositionClass::Race => &res.nets.prune_race,
        PositionClass::Crashed => &res.nets.prune_crashed,
        _ => &res.nets.prune_contact,
    };
    net.evaluate(&input)[0]
}

/// Indices of the candidates `filter` keeps: the top `accept` unconditionally
/// (or, when `accept` is negative, the single best candidate only, the "key
/// move" short circuit), plus up to `extra` more whose score trails the best
/// by no more than `threshold`.
fn shortlist_indices(scores: &[f32], filter: MoveFilter) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));
    if filter.accept < 0 {
        order.truncate(1);
        return order;
    }
    let accept = (filter.accept as usize).min(order.len());
    let best = scores[order[0]];
    let mut kept: Vec<usize> = order[..accept].to_vec();
    for &i in &order[accept..] {
        if kept.len() >= accept + filter.extra as usize {
            break;
        }
        if best - scores[i] <= filter.threshold {
            kept.push(i);
        }
    }
    kept
}

/// Pick the opponent's best reply to `dice` on `mover_view` (opponent already
/// rotated into `Player::Zero`). `ply_index` (0 at the root reply, growing by
/// one per recursion level) selects which row of the
/// [`movefilters::NORMAL`] table ranks and shortlists the candidates before
/// the full net breaks the tie. Returns the resulting board, still in the
/// opponent's perspective.
fn best_reply(
    mover_view: &Board,
    dice: Dice,
    variation: Variation,
    ply_index: usize,
    ctx: &EvalContext,
    res: &SearchResources,
    cache: &mut EquityCache,
    context_bits: u32,
) -> Result<Board, tavli_base::EngineError> {
    let candidates = generate_moves(mover_view, dice, Player::Zero);
    if candidates.len() <= 1 {
        return Ok(candidates.get(0).map_or(*mover_view, |m| m.key.to_board()));
    }

    let boards: Vec<Board> = candidates.iter().map(|m| m.key.to_board()).collect();
    let classes: Vec<PositionClass> = boards.iter().map(|b| classify_board(b, variation, res)).collect();
    let use_prune = ctx.use_prune
        && candidates.len() >= res.config.min_prune_moves
        && classes.iter().all(|&c| c != PositionClass::Contact);

    let mut cheap = Vec::with_capacity(boards.len());
    for (b, &c) in boards.iter().zip(&classes) {
        cheap.push(if use_prune {
            prune_score(b, c, res)
        } else {
            value_after_move(b, variation, ctx, res, cache, context_bits)?.win
        });
    }

    let filter = movefilters::filters_for_plies(&movefilters::NORMAL, ctx.plies)[ply_index.min(3)];
    let shortlist = shortlist_indices(&cheap, filter);

    let mut best_index = shortlist[0];
    let mut best_score = f32::NEG_INFINITY;
    for i in shortlist {
        let score =
            if use_prune { value_after_move(&boards[i], variation, ctx, res, cache, context_bits)?.win } else { cheap[i] };
        if score > best_score {
            best_score = score;
            best_index = i;
        }
    }
    Ok(boards[best_index])
}

/// Recursively evaluate `board_after_move` (mover's own perspective) at
/// `plies`, returning cubeless probabilities for that mover. `ply_index`
/// tracks how many replies deep this call sits below the candidate being
/// scored, for the filter-beam row lookup in [`best_reply`].
#[allow(clippy::too_many_arguments)]
fn value_recursive(
    board_after_move: &Board,
    variation: Variation,
    plies: u8,
    ply_index: usize,
    ctx: &EvalContext,
    res: &SearchResources,
    cache: &mut EquityCache,
    context_bits: u32,
) -> Result<RawOutput, tavli_base::EngineError> {
    if plies == 0 {
        return value_after_move(board_after_move, variation, ctx, res, cache, context_bits);
    }

    let opponent_view = board_after_move.swap_sides();
    let mut acc = RawOutput::zero();
    for roll in ALL_ROLLS.iter() {
        let reply = best_reply(&opponent_view, roll.dice, variation, ply_index, ctx, res, cache, context_bits)?;
        let out = value_recursive(&reply, variation, plies - 1, ply_index + 1, ctx, res, cache, context_bits)?;
        let w = f32::from(roll.weight) / 36.0;
        acc.win += out.win * w;
        acc.win_g += out.win_g * w;
        acc.win_bg += out.win_bg * w;
        acc.lose_g += out.lose_g * w;
        acc.lose_bg += out.lose_bg * w;
    }
    Ok(acc.sanity_clamped().flipped())
}

/// The cubeless-equity-to-cubeful-equity conversion for one scored board,
/// folding back a match-play match-winning-chance into the same equity scale
/// cubeless play already uses.
fn cubeful_equity(
    raw: &RawOutput,
    board_after_move: &Board,
    variation: Variation,
    cube_info: &CubeInfo,
    res: &SearchResources,
) -> f32 {
    let opponent_pips = board_after_move.pip_count(Player::One);
    let class = classify_board(board_after_move, variation, res);
    match (cube_info.is_money_game(), res.met) {
        (true, _) => cube::money_cubeful_equity(raw, cube_info, class, opponent_pips),
        (false, Some(met)) => {
            let mwc = cube::match_cubeful_mwc(raw, cube_info, met, class, opponent_pips);
            cube::mwc_to_equity(mwc, met, cube_info)
        }
        (false, None) => cube::utility(raw, cube_info),
    }
}

/// Score every candidate in `list`: cubeless and (if requested) cubeful
/// equity, the two tie-break fields, and a final descending sort. A one-
/// candidate list (a forced move) is still scored, so callers always see
/// consistent equity fields.
pub fn score_moves(
    list: &mut MoveList,
    variation: Variation,
    cube_info: &CubeInfo,
    ctx: &EvalContext,
    res: &SearchResources,
    cache: &mut EquityCache,
) -> Result<(), tavli_base::EngineError> {
    let context_bits_for = |plies: u8| {
        CacheKey::pack_context(
            plies,
            ctx.cubeful,
            cube_info.on_roll == Player::One,
            ctx.use_prune,
            (cube_info.match_to.saturating_sub(cube_info.score[cube_info.on_roll.index()])).min(63) as u8,
            (cube_info.match_to.saturating_sub(cube_info.score[cube_info.on_roll.other().index()])).min(63) as u8,
            match cube_info.owner {
                tavli_base::CubeOwner::Centered => 0,
                tavli_base::CubeOwner::Player(p) if p == cube_info.on_roll => 1,
                tavli_base::CubeOwner::Player(_) => 2,
            },
            match cube_info.crawford {
                tavli_base::CrawfordState::PreCrawford => 0,
                tavli_base::CrawfordState::Crawford => 1,
                tavli_base::CrawfordState::PostCrawford => 2,
            },
            cube_info.jacoby,
            cube_info.beavers,
        )
    };
    let context_bits = context_bits_for(ctx.plies);

    for mv in list.iter_mut() {
        let board_after = mv.key.to_board();
        let raw = value_recursive(&board_after, variation, ctx.plies, 0, ctx, res, cache, context_bits)?;
        mv.output = raw;
        mv.cubeless_equity = cube::utility_me(&raw, cube_info);
        mv.cubeful_equity = if ctx.cubeful {
            cubeful_equity(&raw, &board_after, variation, cube_info, res)
        } else {
            mv.cubeless_equity
        };
        mv.score = if ctx.cubeful { mv.cubeful_equity } else { mv.cubeless_equity };
        mv.score2 = mv.cubeless_equity;
    }
    list.sort_by_score();

    // Deep-ply rescoring invariant (§4.9): when the top two candidates are
    // close enough that one extra ply could plausibly swap their order,
    // re-score both one ply deeper before committing to the ranking.
    if ctx.plies > 0 && list.len() >= 2 {
        let gap = (list.get(0).unwrap().score - list.get(1).unwrap().score).abs();
        if gap <= res.config.rescore_gap {
            let deeper = EvalContext { plies: ctx.plies + 1, ..*ctx };
            let deeper_bits = context_bits_for(deeper.plies);
            for mv in list.iter_mut().take(2) {
                let board_after = mv.key.to_board();
                let raw = value_recursive(&board_after, variation, deeper.plies, 0, &deeper, res, cache, deeper_bits)?;
                mv.output = raw;
                mv.cubeless_equity = cube::utility_me(&raw, cube_info);
                mv.cubeful_equity = if ctx.cubeful {
                    cubeful_equity(&raw, &board_after, variation, cube_info, res)
                } else {
                    mv.cubeless_equity
                };
                mv.score = if ctx.cubeful { mv.cubeful_equity } else { mv.cubeless_equity };
                mv.score2 = mv.cubeless_equity;
            }
            list.sort_by_score();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavli_base::{Dice as D, Player as P};

    fn resources<'a>(
        nets: &'a NetworkFamily,
        bearoff: &'a BearoffTables,
        config: &'a SearchConfig,
    ) -> SearchResources<'a> {
        SearchResources { nets, bearoff, met: None, config }
    }

    #[test]
    fn zero_ply_scores_a_forced_bearoff_as_a_sure_win() {
        let mut board = Board::empty();
        board[(P::Zero, 0)] = 1;
        board[(P::One, 15)] = 14;
        board[(P::One, 20)] = 1;
        let mut list = generate_moves(&board, D::new(6, 1), P::Zero);
        assert_eq!(list.len(), 1);

        let nets = crate::neuralnet::zero_family();
        let bearoff = crate::bearoff::empty_bearoff_tables_for_test();
        let config = SearchConfig::default();
        let res = resources(&nets, &bearoff, &config);
        let cube_info = CubeInfo::money(P::Zero, Variation::Standard);
        let ctx = EvalContext::new(0, false);
        let mut cache = EquityCache::with_size(64);

        score_moves(&mut list, Variation::Standard, &cube_info, &ctx, &res, &mut cache).unwrap();
        let best = list.best().unwrap();
        assert_eq!(best.output.win, 1.0);
    }

    #[test]
    fn one_ply_search_runs_the_deep_rescore_pass_without_panicking() {
        let board = Board::starting(Variation::Standard);
        let mut list = generate_moves(&board, D::new(3, 1), P::Zero);
        assert!(list.len() > 1);

        let nets = crate::neuralnet::zero_family();
        let bearoff = crate::bearoff::empty_bearoff_tables_for_test();
        let config = SearchConfig::default();
        let res = resources(&nets, &bearoff, &config);
        let cube_info = CubeInfo::money(P::Zero, Variation::Standard);
        let ctx = EvalContext::new(1, false);
        let mut cache = EquityCache::with_size(1024);

        // A zero-weight net scores every candidate identically, so the
        // top-two gap is zero and the rescore pass always fires here.
        score_moves(&mut list, Variation::Standard, &cube_info, &ctx, &res, &mut cache).unwrap();
        assert!(list.best().is_some());
    }

    #[test]
    fn shortlist_keeps_accept_plus_extra_within_threshold() {
        let scores = [0.5, 0.48, 0.3, 0.47, 0.1];
        let filter = MoveFilter { accept: 1, extra: 2, threshold: 0.05 };
        let mut kept = shortlist_indices(&scores, filter);
        kept.sort_unstable();
        assert_eq!(kept, vec![0, 1, 3]);
    }

    #[test]
    fn negative_accept_keeps_only_the_single_best() {
        let scores = [0.2, 0.9, 0.5];
        let filter = MoveFilter { accept: -1, extra: 0, threshold: 0.0 };
        assert_eq!(shortlist_indices(&scores, filter), vec![1]);
    }
}
