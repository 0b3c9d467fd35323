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

//! Bearoff database readers: one-sided (compressed, with gammon probs),
//! two-sided (cubeless or cubeful equity), and hypergammon, all loaded fully
//! into an owned byte buffer (no `mmap`; see DESIGN.md).

use std::fs;
use std::path::Path;

use tavli_base::tables::combination;
use tavli_base::{Board, Player, RawOutput, Variation};

use tavli_base::EngineError;

const HEADER_LEN: usize = 40;
const MAGIC: &[u8; 5] = b"gnubg";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    OneSided,
    TwoSided,
    Hypergammon(u8),
}

#[derive(Clone, Copy, Debug)]
struct Header {
    kind: Kind,
    points: u8,
    chequers: u8,
    gammon_probs: bool,
    compressed: bool,
    cubeful: bool,
}

fn parse_header(bytes: &[u8]) -> Result<Header, EngineError> {
    if bytes.len() < HEADER_LEN || &bytes[0..5] != MAGIC {
        return Err(EngineError::FormatInvalid { detail: "missing gnubg bearoff header".into() });
    }
    let tag = &bytes[6..8];
    let kind = match tag {
        b"TS" => Kind::TwoSided,
        b"OS" => Kind::OneSided,
        [b'H', d] if d.is_ascii_digit() => Kind::Hypergammon(d - b'0'),
        _ => {
            return Err(EngineError::FormatInvalid {
                detail: format!("unrecognized bearoff kind tag {tag:?}"),
            })
        }
    };

    let field_text = std::str::from_utf8(&bytes[8..HEADER_LEN])
        .map_err(|e| EngineError::FormatInvalid { detail: e.to_string() })?;
    let fields: Vec<u32> = field_text
        .split(|c: char| c == '\0' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>().map_err(EngineError::from))
        .collect::<Result<_, _>>()?;

    let (points, chequers, gammon_probs, compressed, cubeful) = match kind {
        Kind::OneSided => {
            let &[points, chequers, gammon, compressed, ..] = fields.as_slice() else {
                return Err(EngineError::FormatInvalid { detail: "truncated OS header fields".into() });
            };
            (points, chequers, gammon != 0, compressed != 0, false)
        }
        Kind::TwoSided => {
            let &[points, chequers, cubeful, ..] = fields.as_slice() else {
                return Err(EngineError::FormatInvalid { detail: "truncated TS header fields".into() });
            };
            (points, chequers, false, false, cubeful != 0)
        }
        Kind::Hypergammon(n) => {
            let &[points, ..] = fields.as_slice() else {
                return Err(EngineError::FormatInvalid { detail: "truncated hypergammon header fields".into() });
            };
            (points, u32::from(n), false, false, true)
        }
    };

    if !(1..=24).contains(&points) || !(1..=15).contains(&chequers) {
        return Err(EngineError::FormatInvalid {
            detail: format!("bearoff point/chequer count out of range: {points}/{chequers}"),
        });
    }

    Ok(Header {
        kind,
        points: points as u8,
        chequers: chequers as u8,
        gammon_probs,
        compressed,
        cubeful,
    })
}

/// Rank the home-board chequer layout `counts` (length `header.points`,
/// remaining chequers implicitly "off") among all `C(chequers+points,
/// points)` such layouts, via the standard stars-and-bars combinadic. This is
/// an independently-derived bijection equivalent in spirit to the source's
/// bearoff indexing, not a transcription of its exact recursion (see
/// DESIGN.md).
#[must_use]
pub fn bearoff_index(counts: &[u8], chequers: u8) -> usize {
    let mut remaining = chequers as usize;
    let mut bars_left = counts.len();
    let mut index = 0usize;
    for &c in counts {
        for _ in 0..c {
            index += combination(remaining - 1 + bars_left, bars_left) as usize;
            remaining -= 1;
        }
        bars_left -= 1;
    }
    index
}

/// Home-board chequer counts (points 0..`points`) for `player`, used to index
/// into a bearoff database; chequers outside the home board make the
/// position ineligible for bearoff lookup (caller must check `classify`
/// first).
#[must_use]
pub fn home_counts(board: &Board, player: Player, points: usize) -> Vec<u8> {
    (0..points).map(|p| board[(player, p)]).collect()
}

fn read_u16_le(bytes: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([bytes[off], bytes[off + 1]])
}

fn read_u32_le(bytes: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
}

fn read_u24_le(bytes: &[u8], off: usize) -> u32 {
    u32::from(bytes[off]) | (u32::from(bytes[off + 1]) << 8) | (u32::from(bytes[off + 2]) << 16)
}

/// A win/gammon probability distribution indexed by rolls-to-bear-off, plus
/// its mean and standard deviation under the roll distribution.
#[derive(Clone, Debug, Default)]
pub struct RollDistribution {
    pub probabilities: Vec<f32>,
    pub mean: f32,
    pub stddev: f32,
}

fn distribution_stats(probabilities: &[f32]) -> (f32, f32) {
    let mean: f32 = probabilities.iter().enumerate().map(|(i, &p)| i as f32 * p).sum();
    let var: f32 = probabilities.iter().enumerate().map(|(i, &p)| (i as f32 - mean).powi(2) * p).sum();
    (mean, var.max(0.0).sqrt())
}

/// One-sided compressed bearoff database: a win-distribution (and, if
/// `gammon_probs`, a gammon distribution) per bearoff index.
pub struct OneSidedDb {
    header: Header,
    data: Vec<u8>,
}

impl OneSidedDb {
    fn entry_size(&self) -> usize {
        if self.header.gammon_probs {
            8
        } else {
            6
        }
    }

    /// Number of bearoff positions the index table covers, i.e. the number of
    /// entries preceding the payload region.
    fn n_positions(&self) -> usize {
        combination(self.header.points as usize + self.header.chequers as usize, self.header.points as usize)
            as usize
    }

    fn read_distribution(&self, payload_off: usize, nz: u8, ioff: u8) -> RollDistribution {
        let mut probabilities = vec![0.0f32; ioff as usize];
        for i in 0..nz as usize {
            let v = read_u16_le(&self.data, payload_off + i * 2);
            probabilities.push(f32::from(v) / 65535.0);
        }
        let (mean, stddev) = distribution_stats(&probabilities);
        RollDistribution { probabilities, mean, stddev }
    }

    /// Win distribution (and gammon distribution, if carried) for bearoff
    /// index `pos`.
    pub fn distributions(&self, pos: usize) -> Result<(RollDistribution, Option<RollDistribution>), EngineError> {
        let rec_off = HEADER_LEN + pos * self.entry_size();
        if rec_off + self.entry_size() > self.data.len() {
            return Err(EngineError::FormatInvalid { detail: "bearoff index out of range".into() });
        }
        let offset = read_u32_le(&self.data, rec_off) as usize;
        let nz = self.data[rec_off + 4];
        let ioff = self.data[rec_off + 5];
        // `offset` is a count of u16s into the payload region that follows the
        // whole index table, not an absolute byte position (see DESIGN.md).
        let payload_base = HEADER_LEN + self.n_positions() * self.entry_size() + 2 * offset;
        let win = self.read_distribution(payload_base, nz, ioff);

        let gammon = if self.header.gammon_probs {
            let gammon_nz = self.data[rec_off + 6];
            let gammon_ioff = self.data[rec_off + 7];
            let gammon_payload_off = payload_base + nz as usize * 2;
            Some(self.read_distribution(gammon_payload_off, gammon_nz, gammon_ioff))
        } else {
            None
        };
        Ok((win, gammon))
    }

    #[must_use]
    pub fn points(&self) -> u8 {
        self.header.points
    }

    #[must_use]
    pub fn chequers(&self) -> u8 {
        self.header.chequers
    }
}

/// Two-sided exact bearoff database: cubeless equity, or a cubeful
/// four-cube-state equity vector, per (us, them) index pair.
pub struct TwoSidedDb {
    header: Header,
    data: Vec<u8>,
}

impl TwoSidedDb {
    fn n(&self) -> usize {
        combination(self.header.points as usize + self.header.chequers as usize, self.header.points as usize) as usize
    }

    fn entry_size(&self) -> usize {
        if self.header.cubeful {
            8
        } else {
            2
        }
    }

    fn record_offset(&self, us: usize, them: usize) -> usize {
        HEADER_LEN + (us * self.n() + them) * self.entry_size()
    }

    /// Cubeless equity in `[-1, 1]` for bearoff indices `us`/`them`.
    pub fn cubeless_equity(&self, us: usize, them: usize) -> Result<f32, EngineError> {
        let off = self.record_offset(us, them);
        if off + 2 > self.data.len() {
            return Err(EngineError::FormatInvalid { detail: "two-sided bearoff index out of range".into() });
        }
        let raw = read_u16_le(&self.data, off);
        Ok(f32::from(raw) / 32767.5 - 1.0)
    }

    /// Cubeful equity vector (one per cube-ownership state) if this database
    /// carries cubeful data.
    pub fn cubeful_equities(&self, us: usize, them: usize) -> Result<[f32; 4], EngineError> {
        if !self.header.cubeful {
            return Err(EngineError::FormatInvalid { detail: "database has no cubeful data".into() });
        }
        let off = self.record_offset(us, them);
        if off + 8 > self.data.len() {
            return Err(EngineError::FormatInvalid { detail: "two-sided bearoff index out of range".into() });
        }
        let mut out = [0.0f32; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            let raw = read_u16_le(&self.data, off + i * 2);
            *slot = f32::from(raw) / 32767.5 - 1.0;
        }
        Ok(out)
    }

    #[must_use]
    pub fn points(&self) -> u8 {
        self.header.points
    }

    #[must_use]
    pub fn chequers(&self) -> u8 {
        self.header.chequers
    }
}

/// Hypergammon database: exact win/gammon/backgammon outputs plus cubeful
/// equities, one 28-byte record per (us, them) index pair.
pub struct HypergammonDb {
    data: Vec<u8>,
    n: usize,
    points: u8,
    chequers: u8,
}

impl HypergammonDb {
    const RECORD_LEN: usize = 28;

    #[must_use]
    pub fn points(&self) -> u8 {
        self.points
    }

    #[must_use]
    pub fn chequers(&self) -> u8 {
        self.chequers
    }

    /// Exact raw output and cubeful-equity vector at bearoff indices
    /// `us`/`them`.
    pub fn record(&self, us: usize, them: usize) -> Result<(RawOutput, [f32; 4]), EngineError> {
        let off = HEADER_LEN + (us * self.n + them) * Self::RECORD_LEN;
        if off + Self::RECORD_LEN > self.data.len() {
            return Err(EngineError::FormatInvalid { detail: "hypergammon index out of range".into() });
        }
        const SCALE: f32 = (1u32 << 24) as f32 - 1.0;
        let unit = |i: usize| read_u24_le(&self.data, off + i * 3) as f32 / SCALE;
        let output = RawOutput {
            win: unit(0),
            win_g: unit(1),
            win_bg: unit(2),
            lose_g: unit(3),
            lose_bg: unit(4),
        };
        let mut equities = [0.0f32; 4];
        for (i, slot) in equities.iter_mut().enumerate() {
            *slot = (unit(5 + i) - 0.5) * 6.0;
        }
        Ok((output, equities))
    }
}

fn load_bytes(path: &Path) -> Result<Vec<u8>, EngineError> {
    fs::read(path).map_err(|_| EngineError::IoMissing { path: path.to_path_buf() })
}

/// All bearoff databases an engine can load: the required one-sided table
/// and the optional two-sided, exhaustive and hypergammon tables.
pub struct BearoffTables {
    pub one_sided: OneSidedDb,
    pub two_sided: Option<TwoSidedDb>,
    /// Exhaustive (uncompressed, full chequer-range) one-sided database,
    /// `gnubg_os.bd`; consulted when a position's chequer count exceeds what
    /// `one_sided` covers.
    pub one_sided_full: Option<OneSidedDb>,
    /// Exhaustive two-sided database, `gnubg_ts.bd`.
    pub two_sided_full: Option<TwoSidedDb>,
    pub hypergammon: [Option<HypergammonDb>; 3],
}

impl BearoffTables {
    /// Load the required `gnubg_os0.bd` and the optional `gnubg_ts0.bd`,
    /// `gnubg_os.bd`, `gnubg_ts.bd`, `hyper1.bd`, `hyper2.bd`, `hyper3.bd`
    /// from `data_dir` (spec §6). A missing optional file is silently
    /// skipped; a present-but-malformed optional file is also skipped, with
    /// a warning, rather than aborting.
    pub fn load(data_dir: &Path) -> Result<BearoffTables, EngineError> {
        let os_path = data_dir.join("gnubg_os0.bd");
        let os_bytes = load_bytes(&os_path)?;
        let os_header = parse_header(&os_bytes)?;
        if os_header.kind != Kind::OneSided {
            return Err(EngineError::FormatInvalid { detail: "gnubg_os0.bd is not a one-sided database".into() });
        }
        let one_sided = OneSidedDb { header: os_header, data: os_bytes };

        let two_sided = load_optional_two_sided(&data_dir.join("gnubg_ts0.bd"));
        let one_sided_full = load_optional_one_sided(&data_dir.join("gnubg_os.bd"));
        let two_sided_full = load_optional_two_sided(&data_dir.join("gnubg_ts.bd"));
        let hypergammon = [
            load_optional_hypergammon(&data_dir.join("hyper1.bd")),
            load_optional_hypergammon(&data_dir.join("hyper2.bd")),
            load_optional_hypergammon(&data_dir.join("hyper3.bd")),
        ];

        Ok(BearoffTables { one_sided, two_sided, one_sided_full, two_sided_full, hypergammon })
    }
}

fn load_optional_one_sided(path: &Path) -> Option<OneSidedDb> {
    let bytes = fs::read(path).ok()?;
    let header = parse_header(&bytes).ok()?;
    if header.kind != Kind::OneSided {
        eprintln!("tavli: {} is not a one-sided bearoff database, skipping", path.display());
        return None;
    }
    Some(OneSidedDb { header, data: bytes })
}

fn load_optional_two_sided(path: &Path) -> Option<TwoSidedDb> {
    let bytes = fs::read(path).ok()?;
    let header = parse_header(&bytes).ok()?;
    if header.kind != Kind::TwoSided {
        eprintln!("tavli: {} is not a two-sided bearoff database, skipping", path.display());
        return None;
    }
    Some(TwoSidedDb { header, data: bytes })
}

fn load_optional_hypergammon(path: &Path) -> Option<HypergammonDb> {
    let bytes = fs::read(path).ok()?;
    let header = parse_header(&bytes).ok()?;
    let Kind::Hypergammon(chequers) = header.kind else {
        eprintln!("tavli: {} is not a hypergammon bearoff database, skipping", path.display());
        return None;
    };
    let n = combination(header.points as usize + chequers as usize, header.points as usize) as usize;
    Some(HypergammonDb { data: bytes, n, points: header.points, chequers: chequers as u8 })
}

/// Which hypergammon variant (if any) `variation` names, for selecting which
/// of the three hypergammon databases to probe.
#[must_use]
pub fn hypergammon_slot(variation: Variation) -> Option<usize> {
    match variation {
        Variation::Hypergammon1 => Some(0),
        Variation::Hypergammon2 => Some(1),
        Variation::Hypergammon3 => Some(2),
        _ => None,
    }
}

/// An empty one-sided database with a plausible standard-backgammon header,
/// for tests (and [`crate::Engine::for_testing`]) that need a
/// `BearoffTables` value to exist without exercising any lookup.
pub(crate) fn empty_bearoff_tables_for_test() -> BearoffTables {
    let header =
        Header { kind: Kind::OneSided, points: 6, chequers: 15, gammon_probs: true, compressed: true, cubeful: false };
    BearoffTables {
        one_sided: OneSidedDb { header, data: vec![0u8; HEADER_LEN] },
        two_sided: None,
        one_sided_full: None,
        two_sided_full: None,
        hypergammon: [None, None, None],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_header(tag: &[u8; 2], fields: &str) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_LEN];
        h[0..5].copy_from_slice(MAGIC);
        h[6..8].copy_from_slice(tag);
        let field_bytes = fields.as_bytes();
        h[8..8 + field_bytes.len()].copy_from_slice(field_bytes);
        h
    }

    #[test]
    fn parses_one_sided_header() {
        let bytes = fake_header(b"OS", "6 15 1 1");
        let header = parse_header(&bytes).unwrap();
        assert_eq!(header.kind, Kind::OneSided);
        assert_eq!(header.points, 6);
        assert_eq!(header.chequers, 15);
        assert!(header.gammon_probs);
        assert!(header.compressed);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[0..5].copy_from_slice(b"xxxxx");
        assert!(parse_header(&bytes).is_err());
    }

    #[test]
    fn bearoff_index_covers_full_range_without_collision() {
        let points = 3usize;
        let chequers = 3u8;
        let total = combination(points + chequers as usize, points) as usize;
        let mut seen = std::collections::HashSet::new();
        for a in 0..=chequers {
            for b in 0..=(chequers - a) {
                let c = chequers - a - b;
                let idx = bearoff_index(&[a, b, c], chequers);
                assert!(idx < total);
                assert!(seen.insert(idx), "duplicate index for {a},{b},{c}");
            }
        }
    }

    #[test]
    fn empty_board_indexes_to_zero() {
        assert_eq!(bearoff_index(&[0, 0, 0], 3), 0);
    }
}
