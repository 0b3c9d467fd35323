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

//! Reference tables built once and shared read-only for the life of an
//! engine: the combination table, the sigmoid LUT, the "ways to hit" table,
//! and the escape tables.

use once_cell::sync::Lazy;

/// `combination(n, k)` = C(n, k), for n up to 40 and k up to 25, built by the
/// standard Pascal's-triangle recurrence. Used to index two-sided bearoff
/// positions (`N = C(nPoints + nChequers, nPoints)`).
pub static COMBINATIONS: Lazy<Vec<Vec<u64>>> = Lazy::new(|| {
    const MAX_N: usize = 41;
    const MAX_K: usize = 26;
    let mut c = vec![vec![0u64; MAX_K]; MAX_N];
    for row in c.iter_mut() {
        row[0] = 1;
    }
    for n in 1..MAX_N {
        for k in 1..MAX_K.min(n + 1) {
            c[n][k] = c[n - 1][k - 1] + c[n - 1].get(k).copied().unwrap_or(0);
        }
    }
    c
});

#[must_use]
pub fn combination(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    COMBINATIONS[n][k]
}

const SIGMOID_LUT_SIZE: usize = 4096;
const SIGMOID_MAX_X: f32 = 20.0;

/// Piecewise-linear lookup table for the logistic function over `x in
/// [0, SIGMOID_MAX_X]`; negative arguments use the identity `f(-x) = 1 -
/// f(x)` and arguments beyond the table saturate to 0 or 1.
pub static SIGMOID_LUT: Lazy<Vec<f32>> = Lazy::new(|| {
    (0..=SIGMOID_LUT_SIZE)
        .map(|i| {
            let x = (i as f32 / SIGMOID_LUT_SIZE as f32) * SIGMOID_MAX_X;
            1.0 / (1.0 + x.exp())
        })
        .collect()
});

/// The logistic function `1 / (1 + exp(x))`, matching the network's
/// activation convention (spec §4.3). Implemented as a table-interpolated
/// lookup, which the spec explicitly allows in place of calling `exp`
/// directly on every activation.
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    if x < 0.0 {
        return 1.0 - sigmoid(-x);
    }
    if x >= SIGMOID_MAX_X {
        return 0.0;
    }
    let scaled = x / SIGMOID_MAX_X * SIGMOID_LUT_SIZE as f32;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(SIGMOID_LUT_SIZE);
    let frac = scaled - lo as f32;
    SIGMOID_LUT[lo] * (1.0 - frac) + SIGMOID_LUT[hi] * frac
}

/// For each pip distance `1..=24`, how many of the 36 ordered dice rolls can
/// reach exactly that distance using some non-empty subset of the roll's
/// dice (a single die, the sum of both dice, or — for doubles — two, three
/// or all four uses of the same die). This is the "ways to hit" table the
/// escape tables are built from.
pub static WAYS_TO_REACH: Lazy<[u8; 25]> = Lazy::new(|| {
    let mut ways = [0u8; 25];
    for d0 in 1..=6u32 {
        for d1 in 1..=6u32 {
            let mut reachable = std::collections::BTreeSet::new();
            reachable.insert(d0);
            reachable.insert(d1);
            reachable.insert(d0 + d1);
            if d0 == d1 {
                reachable.insert(d0 * 3);
                reachable.insert(d0 * 4);
            }
            for d in reachable {
                if d <= 24 {
                    ways[d as usize] += 1;
                }
            }
        }
    }
    ways
});

const ESCAPE_WINDOW: usize = 12;

/// Can a single checker escape past a 12-point blocking window, given the
/// dice available and which of those 12 points ahead are blocked (bit `i`
/// set means point `i+1` is occupied by 2+ enemy chequers)? Escape means some
/// legal sequence of the dice lands the checker beyond the window, without
/// ever being forced to land on a blocked point along the way.
fn can_escape(dice: &[u8], mask: u16) -> bool {
    fn blocked(point: u32, mask: u16) -> bool {
        point >= 1 && point <= ESCAPE_WINDOW as u32 && (mask & (1 << (point - 1))) != 0
    }

    fn search(remaining: &[u8], traveled: u32, mask: u16) -> bool {
        if traveled as usize > ESCAPE_WINDOW {
            return true;
        }
        if remaining.is_empty() {
            return false;
        }
        for (i, &d) in remaining.iter().enumerate() {
            let next_traveled = traveled + d as u32;
            if next_traveled as usize > ESCAPE_WINDOW || !blocked(next_traveled, mask) {
                let mut rest: Vec<u8> = remaining.to_vec();
                rest.remove(i);
                if search(&rest, next_traveled, mask) {
                    return true;
                }
            }
        }
        false
    }

    // Using zero dice never counts as an escape by itself, but every prefix
    // (using 1, 2, 3 or 4 of the available dice) is tried via the recursion
    // bottoming out when `remaining` is exhausted without having passed 12.
    search(dice, 0, mask)
}

fn dice_for_roll(d0: u8, d1: u8) -> Vec<u8> {
    if d0 == d1 {
        vec![d0; 4]
    } else {
        vec![d0, d1]
    }
}

/// `ESCAPES[mask]`: out of the 21 distinct rolls, how many let a checker
/// escape a blocking pattern described by `mask` (bit `i` = point `i+1`
/// blocked, 12-bit window ahead of the checker).
pub static ESCAPES: Lazy<Vec<u8>> = Lazy::new(|| {
    (0..4096u32)
        .map(|mask| {
            let mask = mask as u16;
            let mut count = 0u8;
            for d0 in 1..=6u8 {
                for d1 in d0..=6u8 {
                    if can_escape(&dice_for_roll(d0, d1), mask) {
                        count += 1;
                    }
                }
            }
            count
        })
        .collect()
});

/// Same as [`ESCAPES`] but with the lowest set bit (the nearest blocked
/// point) cleared first — used where the evaluator already accounts for the
/// very next point separately (spec §4.4).
pub static ESCAPES_EXCLUDING_NEAREST: Lazy<Vec<u8>> = Lazy::new(|| {
    (0..4096usize)
        .map(|mask| {
            let cleared = (mask as u16) & ((mask as u16).wrapping_sub(1));
            ESCAPES[cleared as usize]
        })
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combination_matches_pascals_identity() {
        assert_eq!(combination(5, 2), 10);
        assert_eq!(combination(6, 6), 1);
        assert_eq!(combination(6, 0), 1);
    }

    #[test]
    fn sigmoid_is_one_half_at_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn sigmoid_saturates_towards_bounds() {
        assert!(sigmoid(20.0) < 0.01);
        assert!(sigmoid(-20.0) > 0.99);
    }

    #[test]
    fn ways_to_reach_distance_one_is_eleven_of_thirty_six() {
        // The eleven rolls containing at least one 1: 1-1..1-6 and 2-1..6-1.
        assert_eq!(WAYS_TO_REACH[1], 11);
    }

    #[test]
    fn open_window_always_escapes() {
        assert!(ESCAPES[0] == 21);
    }

    #[test]
    fn fully_blocked_window_never_escapes_with_small_dice() {
        // every point 1..12 blocked: no subset of any roll's dice can ever
        // land past 12 without landing on a blocked point first.
        let full_mask = 0xFFFu16;
        assert_eq!(ESCAPES[full_mask as usize], 0);
    }
}
