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

//! Position classification: deciding which evaluator (network, bearoff
//! database or closed-form) a leaf board is dispatched to.

use crate::board::{Board, Player, Variation, BAR};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PositionClass {
    Over,
    Hypergammon1,
    Hypergammon2,
    Hypergammon3,
    Bearoff2,
    BearoffTwoSidedDisk,
    Bearoff1,
    BearoffOneSidedDisk,
    Race,
    Crashed,
    Contact,
}

/// Which bearoff databases are available to probe, in priority order
/// (spec §4.1: two-sided-memory, two-sided-disk, one-sided-memory,
/// one-sided-disk).
#[derive(Clone, Copy, Debug, Default)]
pub struct BearoffAvailability {
    pub two_sided_memory: bool,
    pub two_sided_disk: bool,
    pub one_sided_memory: bool,
    pub one_sided_disk: bool,
}

/// How many chequers `player` has in play (on the 24 points plus the bar),
/// used by the crashed-side test.
fn active_chequers(board: &Board, player: Player) -> u32 {
    (0..24).map(|p| board[(player, p)] as u32).sum::<u32>() + board[(player, BAR)] as u32
}

/// The exact crashed-side test from spec §4.1, applied to one side with `tot`
/// active chequers and ace/deuce-point stacks `board[0]`/`board[1]`.
fn is_crashed_side(board: &Board, player: Player) -> bool {
    let tot = active_chequers(board, player);
    let ace = board[(player, 0)] as u32;
    let deuce = board[(player, 1)] as u32;
    const N: u32 = 6;
    if tot <= N {
        return true;
    }
    if ace > 1 {
        if tot <= N + ace {
            return true;
        }
        if deuce > 1 && 1 + tot >= ace + deuce && 1 + tot - ace - deuce <= N {
            return true;
        }
        false
    } else {
        tot <= N + deuce.saturating_sub(1)
    }
}

/// Decide a board's evaluation class. `bearoff` describes which bearoff
/// databases are loaded and should be tried, in priority order.
#[must_use]
pub fn classify(board: &Board, variation: Variation, bearoff: BearoffAvailability) -> PositionClass {
    let back_zero = board.back_point(Player::Zero);
    let back_one = board.back_point(Player::One);

    let (Some(back_zero), Some(back_one)) = (back_zero, back_one) else {
        return PositionClass::Over;
    };

    match variation {
        Variation::Hypergammon1 => return PositionClass::Hypergammon1,
        Variation::Hypergammon2 => return PositionClass::Hypergammon2,
        Variation::Hypergammon3 => return PositionClass::Hypergammon3,
        Variation::Standard | Variation::Nackgammon => {}
    }

    if back_zero + back_one > 22 {
        if is_crashed_side(board, Player::Zero) || is_crashed_side(board, Player::One) {
            return PositionClass::Crashed;
        }
        return PositionClass::Contact;
    }

    if bearoff.two_sided_memory {
        return PositionClass::Bearoff2;
    }
    if bearoff.two_sided_disk {
        return PositionClass::BearoffTwoSidedDisk;
    }
    if bearoff.one_sided_memory {
        return PositionClass::Bearoff1;
    }
    if bearoff.one_sided_disk {
        return PositionClass::BearoffOneSidedDisk;
    }
    PositionClass::Race
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_is_contact() {
        let b = Board::starting(Variation::Standard);
        let class = classify(&b, Variation::Standard, BearoffAvailability::default());
        assert_eq!(class, PositionClass::Contact);
    }

    #[test]
    fn empty_side_is_over() {
        let mut b = Board::empty();
        b[(Player::One, 0)] = 1;
        let class = classify(&b, Variation::Standard, BearoffAvailability::default());
        assert_eq!(class, PositionClass::Over);
    }

    #[test]
    fn separated_sides_with_no_bearoff_db_is_race() {
        let mut b = Board::empty();
        b[(Player::Zero, 20)] = 15;
        b[(Player::One, 20)] = 15;
        let class = classify(&b, Variation::Standard, BearoffAvailability::default());
        assert_eq!(class, PositionClass::Race);
    }

    #[test]
    fn separated_sides_prefer_two_sided_memory_bearoff() {
        let mut b = Board::empty();
        b[(Player::Zero, 2)] = 2;
        b[(Player::One, 2)] = 2;
        let avail = BearoffAvailability { two_sided_memory: true, ..Default::default() };
        assert_eq!(classify(&b, Variation::Standard, avail), PositionClass::Bearoff2);
    }

    #[test]
    fn crashed_side_with_six_or_fewer_active_chequers() {
        let mut b = Board::empty();
        b[(Player::Zero, 0)] = 6;
        b[(Player::One, 23)] = 15;
        assert_eq!(
            classify(&b, Variation::Standard, BearoffAvailability::default()),
            PositionClass::Crashed
        );
    }

    #[test]
    fn hypergammon_variation_short_circuits() {
        let b = Board::starting(Variation::Hypergammon2);
        assert_eq!(
            classify(&b, Variation::Hypergammon2, BearoffAvailability::default()),
            PositionClass::Hypergammon2
        );
    }
}
