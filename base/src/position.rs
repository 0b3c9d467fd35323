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

//! A compact, canonical encoding of a board as seven 32-bit words.
//!
//! Each of a player's 24 playing points (0..23) gets a 4-bit nibble holding
//! its chequer count; three words hold one player's 24 points (8 nibbles
//! each), and the last word holds both players' bar counts in its low byte.
//! This is small enough to use directly as a hash-map key or a cache tag
//! without hashing it again (see [`nohash_hasher`] usage at call sites).

use crate::board::{Board, Player, BAR};

/// Canonical, bit-packed identity of a board. Two boards with the same chequer
/// layout always produce the same key, and the key round-trips exactly
/// through [`PositionKey::to_board`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PositionKey(pub [u32; 7]);

impl PositionKey {
    /// Pack a board into its canonical key. Player One's 24 points fill words
    /// 0..3, Player Zero's fill words 3..6, and word 6 holds both bar counts.
    #[must_use]
    pub fn from_board(b: &Board) -> PositionKey {
        let mut words = [0u32; 7];
        pack_player(&mut words[0..3], b, Player::One);
        pack_player(&mut words[3..6], b, Player::Zero);
        let bar0 = b[(Player::Zero, BAR)] as u32 & 0xF;
        let bar1 = b[(Player::One, BAR)] as u32 & 0xF;
        words[6] = bar0 | (bar1 << 4);
        PositionKey(words)
    }

    /// Unpack the key back into a board. Exact inverse of [`from_board`] for
    /// any board whose per-point counts fit in 4 bits (0..15), which holds
    /// for every legal chequer count.
    #[must_use]
    pub fn to_board(&self) -> Board {
        let mut b = Board::empty();
        unpack_player(&self.0[0..3], &mut b, Player::One);
        unpack_player(&self.0[3..6], &mut b, Player::Zero);
        b[(Player::Zero, BAR)] = (self.0[6] & 0xF) as u8;
        b[(Player::One, BAR)] = ((self.0[6] >> 4) & 0xF) as u8;
        b
    }
}

fn pack_player(words: &mut [u32], b: &Board, player: Player) {
    for point in 0..24 {
        let n = b[(player, point)] as u32 & 0xF;
        let word_idx = point / 8;
        let nibble_idx = point % 8;
        words[word_idx] |= n << (4 * nibble_idx);
    }
}

fn unpack_player(words: &[u32], b: &mut Board, player: Player) {
    for point in 0..24 {
        let word_idx = point / 8;
        let nibble_idx = point % 8;
        let n = (words[word_idx] >> (4 * nibble_idx)) & 0xF;
        b[(player, point)] = n as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Variation;

    #[test]
    fn round_trip_is_identity_for_starting_position() {
        let b = Board::starting(Variation::Standard);
        let key = PositionKey::from_board(&b);
        assert_eq!(key.to_board(), b);
    }

    #[test]
    fn opening_position_key_matches_known_vector() {
        let b = Board::starting(Variation::Standard);
        let key = PositionKey::from_board(&b);
        assert_eq!(
            key.0,
            [810_549_248, 327_680, 536_870_912, 810_549_248, 327_680, 536_870_912, 0]
        );
    }

    #[test]
    fn equality_is_bitwise_equality_of_words() {
        let a = PositionKey([1, 2, 3, 4, 5, 6, 7]);
        let b = PositionKey([1, 2, 3, 4, 5, 6, 7]);
        let c = PositionKey([1, 2, 3, 4, 5, 6, 8]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn bar_counts_round_trip() {
        let mut b = Board::empty();
        b[(Player::Zero, BAR)] = 3;
        b[(Player::One, BAR)] = 2;
        let key = PositionKey::from_board(&b);
        assert_eq!(key.to_board(), b);
    }
}
