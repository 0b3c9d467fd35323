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

//! The equity cache: a fixed-size, power-of-two bucket array with a two-slot
//! (primary/secondary) LRU protocol (§4.5). Unlike the teacher's
//! transposition table this is a safe `Vec<Bucket>` mutated through
//! `&mut self`; see DESIGN.md for why the unsafe raw-pointer storage isn't
//! needed here.

use tavli_base::{PositionKey, RawOutput};

/// Marks a payload slot as carrying a valid cubeful equity alongside the raw
/// output, matching the original's `0x6a47b47e` cubeful-equity tag.
const CUBEFUL_MARK: u32 = 0x6a47_b47e;

/// The per-entry identity: a position key plus the search settings the
/// cached evaluation was computed under. Two calls with the same board but
/// different plies, cube state, or score must not collide.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CacheKey {
    pub position: PositionKey,
    pub context_bits: u32,
}

impl CacheKey {
    /// Pack the search context that distinguishes otherwise-identical
    /// position lookups into a single 32-bit word: plies, cubeful flag,
    /// side on roll, prune flag, the (clamped) match-away scores, cube
    /// owner, and the Crawford/Jacoby/Beavers rule bits.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn pack_context(
        plies: u8,
        cubeful: bool,
        on_roll_one: bool,
        use_prune: bool,
        away_us: u8,
        away_them: u8,
        cube_owner: u8,
        crawford: u8,
        jacoby: bool,
        beavers: bool,
    ) -> u32 {
        let mut bits = u32::from(plies & 0x7);
        bits |= u32::from(cubeful) << 3;
        bits |= u32::from(on_roll_one) << 4;
        bits |= u32::from(use_prune) << 5;
        bits |= u32::from(away_us.min(63)) << 6;
        bits |= u32::from(away_them.min(63)) << 12;
        bits |= u32::from(cube_owner & 0x3) << 18;
        bits |= u32::from(crawford & 0x3) << 20;
        bits |= u32::from(jacoby) << 22;
        bits |= u32::from(beavers) << 23;
        bits
    }
}

fn mix64(mut k: u64) -> u64 {
    // MurmurHash3's 64-bit finalizer, the same mixing constants the
    // original's `getHashKey` applies to the packed position+context words.
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

fn hash_key(key: &CacheKey) -> u64 {
    let mut h = u64::from(key.context_bits) ^ u64::from(CUBEFUL_MARK);
    for &word in &key.position.0 {
        h = mix64(h ^ u64::from(word));
    }
    h
}

/// One cached evaluation: five raw probabilities plus a cubeful equity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CachedPayload(pub [f32; 6]);

impl CachedPayload {
    #[must_use]
    pub fn new(output: RawOutput, cubeful_equity: f32) -> CachedPayload {
        CachedPayload([output.win, output.win_g, output.win_bg, output.lose_g, output.lose_bg, cubeful_equity])
    }

    #[must_use]
    pub fn output(&self) -> RawOutput {
        RawOutput { win: self.0[0], win_g: self.0[1], win_bg: self.0[2], lose_g: self.0[3], lose_bg: self.0[4] }
    }

    #[must_use]
    pub fn cubeful_equity(&self) -> f32 {
        self.0[5]
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    occupied: bool,
    key: CacheKey,
    payload: CachedPayload,
}

impl Default for CacheKey {
    fn default() -> Self {
        CacheKey { position: PositionKey([0; 7]), context_bits: 0 }
    }
}

#[derive(Clone, Debug, Default)]
struct Bucket {
    primary: Slot,
    secondary: Slot,
}

/// A bounded, power-of-two equity cache with two-way LRU replacement and no
/// resizing after construction.
pub struct EquityCache {
    buckets: Vec<Bucket>,
    mask: u64,
    hits: u64,
    lookups: u64,
}

impl EquityCache {
    /// Build a cache with `size` buckets, rounded down to the nearest power
    /// of two (minimum 1).
    #[must_use]
    pub fn with_size(size: usize) -> EquityCache {
        let n = size.max(1).next_power_of_two();
        let n = if n > size.max(1) { n >> 1 } else { n }.max(1);
        EquityCache { buckets: vec![Bucket::default(); n], mask: (n - 1) as u64, hits: 0, lookups: 0 }
    }

    fn index(&self, hash: u64) -> usize {
        (hash & self.mask) as usize
    }

    /// Probe the cache: primary first, then secondary (promoting it to
    /// primary on a secondary hit, per the 2-way-LRU protocol).
    pub fn get(&mut self, key: &CacheKey) -> Option<CachedPayload> {
        self.lookups += 1;
        let hash = hash_key(key);
        let idx = self.index(hash);
        let bucket = &mut self.buckets[idx];

        if bucket.primary.occupied && bucket.primary.key == *key {
            self.hits += 1;
            return Some(bucket.primary.payload);
        }
        if bucket.secondary.occupied && bucket.secondary.key == *key {
            self.hits += 1;
            std::mem::swap(&mut bucket.primary, &mut bucket.secondary);
            return Some(bucket.primary.payload);
        }
        None
    }

    /// Insert a new entry: the old primary is demoted to secondary (losing
    /// whatever was in secondary), and the new value becomes primary.
    pub fn add(&mut self, key: CacheKey, payload: CachedPayload) {
        let hash = hash_key(&key);
        let idx = self.index(hash);
        let bucket = &mut self.buckets[idx];
        bucket.secondary = bucket.primary;
        bucket.primary = Slot { occupied: true, key, payload };
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Fraction of lookups since construction (or the last `reset_stats`)
    /// that hit either slot.
    #[must_use]
    pub fn hit_rate(&self) -> f32 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f32 / self.lookups as f32
        }
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.lookups = 0;
    }

    /// Drop every entry without reallocating.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = Bucket::default();
        }
        self.reset_stats();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavli_base::{Board, Player, Variation};

    fn sample_key(seed: u32) -> CacheKey {
        let mut board = Board::starting(Variation::Standard);
        board[(Player::Zero, 0)] = (seed % 5) as u8;
        CacheKey { position: PositionKey::from_board(&board), context_bits: seed }
    }

    #[test]
    fn miss_then_hit_round_trips_the_payload() {
        let mut cache = EquityCache::with_size(64);
        let key = sample_key(1);
        assert!(cache.get(&key).is_none());

        let payload = CachedPayload::new(RawOutput { win: 0.6, win_g: 0.1, win_bg: 0.0, lose_g: 0.05, lose_bg: 0.0 }, 0.3);
        cache.add(key, payload);
        assert_eq!(cache.get(&key), Some(payload));
    }

    #[test]
    fn two_identical_lookups_between_which_nothing_was_added_agree() {
        let mut cache = EquityCache::with_size(64);
        let key = sample_key(7);
        let payload = CachedPayload::new(RawOutput::zero(), -0.2);
        cache.add(key, payload);

        let first = cache.get(&key);
        let second = cache.get(&key);
        assert_eq!(first, second);
    }

    #[test]
    fn a_third_distinct_key_in_the_same_bucket_only_evicts_the_secondary_slot() {
        let mut cache = EquityCache::with_size(1);
        let k1 = sample_key(1);
        let k2 = sample_key(2);
        let k3 = sample_key(3);
        let p1 = CachedPayload::new(RawOutput::zero(), 0.1);
        let p2 = CachedPayload::new(RawOutput::zero(), 0.2);
        let p3 = CachedPayload::new(RawOutput::zero(), 0.3);

        cache.add(k1, p1);
        cache.add(k2, p2);
        // k1 was demoted to secondary, k2 is primary; k1 should still hit.
        assert_eq!(cache.get(&k1), Some(p1));
        // that promoted k1 back to primary, demoting k2 to secondary.
        cache.add(k3, p3);
        // k3 is primary, k1 (last touched) is secondary; k2 was evicted.
        assert_eq!(cache.get(&k2), None);
        assert_eq!(cache.get(&k3), Some(p3));
    }

    #[test]
    fn size_is_rounded_down_to_a_power_of_two() {
        let cache = EquityCache::with_size(100);
        assert_eq!(cache.len(), 64);
    }

    #[test]
    fn hit_rate_reflects_observed_lookups() {
        let mut cache = EquityCache::with_size(64);
        let key = sample_key(9);
        assert!(cache.get(&key).is_none());
        cache.add(key, CachedPayload::new(RawOutput::zero(), 0.0));
        assert!(cache.get(&key).is_some());
        assert!((cache.hit_rate() - 0.5).abs() < 1e-6);
    }
}
