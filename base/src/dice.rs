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

//! Dice rolls and the 21-roll distribution used by the plied search.

use once_cell::sync::Lazy;

/// An ordered pair of die faces, each in `1..=6`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dice(pub u8, pub u8);

impl Dice {
    /// # Panics
    /// Panics if either face is outside `1..=6`.
    #[must_use]
    pub fn new(d0: u8, d1: u8) -> Dice {
        assert!((1..=6).contains(&d0) && (1..=6).contains(&d1), "dice out of range");
        Dice(d0, d1)
    }

    #[must_use]
    pub const fn is_double(self) -> bool {
        self.0 == self.1
    }

    /// The sequence of dice to place, in order. Doubles place the same value
    /// four times; non-doubles place the two faces once each (the generator
    /// separately tries both orderings).
    #[must_use]
    pub fn sequence(self) -> Vec<u8> {
        if self.is_double() {
            vec![self.0; 4]
        } else {
            vec![self.0, self.1]
        }
    }
}

/// One of the 21 distinguishable dice rolls, paired with the number of ways
/// it can occur out of 36 (1 for doubles, 2 for non-doubles). Used to weight
/// the opponent-reply average in the plied search (spec §4.9).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeightedRoll {
    pub dice: Dice,
    pub weight: u8,
}

/// The 21 unordered dice rolls with their weights, summing to 36.
pub static ALL_ROLLS: Lazy<[WeightedRoll; 21]> = Lazy::new(|| {
    let mut rolls = Vec::with_capacity(21);
    for d0 in 1..=6u8 {
        for d1 in d0..=6u8 {
            let weight = if d0 == d1 { 1 } else { 2 };
            rolls.push(WeightedRoll {
                dice: Dice(d0, d1),
                weight,
            });
        }
    }
    rolls.try_into().unwrap()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rolls_weight_sums_to_36() {
        let total: u32 = ALL_ROLLS.iter().map(|r| r.weight as u32).sum();
        assert_eq!(total, 36);
    }

    #[test]
    fn doubles_sequence_has_four_dice() {
        assert_eq!(Dice::new(3, 3).sequence(), vec![3, 3, 3, 3]);
    }

    #[test]
    fn non_doubles_sequence_has_two_dice() {
        assert_eq!(Dice::new(6, 1).sequence(), vec![6, 1]);
    }

    #[test]
    #[should_panic(expected = "dice out of range")]
    fn invalid_die_panics() {
        Dice::new(7, 1);
    }
}
