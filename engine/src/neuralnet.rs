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

//! A fully-connected two-layer network with the incremental-base evaluation
//! optimization (§4.3): a saved hidden-activation base lets sibling
//! evaluations that share most of their input vector skip most of the
//! forward pass.

use tavli_base::tables::sigmoid;

use tavli_base::EngineError;

const WEIGHTS_MAGIC: &str = "GNU Backgammon";
const WEIGHTS_VERSION: &str = "1.00";

/// One fully-connected two-layer network.
pub struct NeuralNet {
    pub n_input: usize,
    pub n_hidden: usize,
    pub n_output: usize,
    pub beta_hidden: f32,
    pub beta_output: f32,
    /// Row-major `n_hidden x n_input`.
    weight_hidden: Vec<f32>,
    /// Row-major `n_output x n_hidden`.
    weight_output: Vec<f32>,
    threshold_hidden: Vec<f32>,
    threshold_output: Vec<f32>,
}

/// A saved forward-pass base for the incremental ("from-base") path: the
/// input vector and pre-sigmoid hidden activations from the most recent
/// `evaluate_save` call.
#[derive(Clone, Debug, Default)]
pub struct EvalBase {
    saved_input: Vec<f32>,
    saved_hidden: Vec<f32>,
}

impl NeuralNet {
    fn hidden_at(&self, h: usize, input: &[f32]) -> f32 {
        let row = &self.weight_hidden[h * self.n_input..(h + 1) * self.n_input];
        self.threshold_hidden[h] + row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>()
    }

    fn outputs_from_hidden(&self, hidden: &[f32]) -> Vec<f32> {
        (0..self.n_output)
            .map(|o| {
                let row = &self.weight_output[o * self.n_hidden..(o + 1) * self.n_hidden];
                let pre = self.threshold_output[o] + row.iter().zip(hidden).map(|(w, h)| w * h).sum::<f32>();
                sigmoid(self.beta_output * pre)
            })
            .collect()
    }

    /// Plain forward pass: threshold + weighted sum, sigmoid, repeat.
    #[must_use]
    pub fn evaluate(&self, input: &[f32]) -> Vec<f32> {
        let hidden: Vec<f32> =
            (0..self.n_hidden).map(|h| sigmoid(self.beta_hidden * self.hidden_at(h, input))).collect();
        self.outputs_from_hidden(&hidden)
    }

    /// Forward pass that also saves the pre-sigmoid hidden activations and
    /// input vector into `base`, so a sibling call can later resume from it
    /// via [`NeuralNet::evaluate_from_base`].
    pub fn evaluate_save(&self, input: &[f32], base: &mut EvalBase) -> Vec<f32> {
        base.saved_input = input.to_vec();
        base.saved_hidden = (0..self.n_hidden).map(|h| self.hidden_at(h, input)).collect();
        let hidden: Vec<f32> = base.saved_hidden.iter().map(|&pre| sigmoid(self.beta_hidden * pre)).collect();
        self.outputs_from_hidden(&hidden)
    }

    /// Incremental forward pass: `new_input` is assumed to differ from
    /// `base.saved_input` in only a few places. Recomputes only the hidden
    /// deltas those differences cause, skipping zero deltas and special-casing
    /// `+-1` (spec §4.3).
    ///
    /// # Panics
    /// Panics if `new_input.len()` doesn't match the saved base's length.
    #[must_use]
    pub fn evaluate_from_base(&self, new_input: &[f32], base: &EvalBase) -> Vec<f32> {
        assert_eq!(new_input.len(), base.saved_input.len(), "input length mismatch against saved base");
        let mut hidden_pre = base.saved_hidden.clone();
        for i in 0..self.n_input {
            let delta = new_input[i] - base.saved_input[i];
            if delta == 0.0 {
                continue;
            }
            if delta == 1.0 {
                for h in 0..self.n_hidden {
                    hidden_pre[h] += self.weight_hidden[h * self.n_input + i];
                }
            } else if delta == -1.0 {
                for h in 0..self.n_hidden {
                    hidden_pre[h] -= self.weight_hidden[h * self.n_input + i];
                }
            } else {
                for h in 0..self.n_hidden {
                    hidden_pre[h] += delta * self.weight_hidden[h * self.n_input + i];
                }
            }
        }
        let hidden: Vec<f32> = hidden_pre.iter().map(|&pre| sigmoid(self.beta_hidden * pre)).collect();
        self.outputs_from_hidden(&hidden)
    }
}

/// The six networks a complete weights file carries, in declaration order.
pub struct NetworkFamily {
    pub contact: NeuralNet,
    pub race: NeuralNet,
    pub crashed: NeuralNet,
    pub prune_contact: NeuralNet,
    pub prune_race: NeuralNet,
    pub prune_crashed: NeuralNet,
}

fn parse_net(lines: &mut impl Iterator<Item = Result<String, std::io::Error>>) -> Result<NeuralNet, EngineError> {
    let header = lines
        .next()
        .ok_or_else(|| EngineError::FormatInvalid { detail: "truncated weights file: missing net header".into() })??;
    let mut parts = header.split_whitespace();
    let mut next_usize = || -> Result<usize, EngineError> {
        parts
            .next()
            .ok_or_else(|| EngineError::FormatInvalid { detail: "truncated net header".into() })?
            .parse()
            .map_err(EngineError::from)
    };
    let n_input = next_usize()?;
    let n_hidden = next_usize()?;
    let n_output = next_usize()?;
    let _tag = parts.next(); // network name/tag, unused beyond documentation
    let mut next_f32 = || -> Result<f32, EngineError> {
        parts
            .next()
            .ok_or_else(|| EngineError::FormatInvalid { detail: "truncated net header".into() })?
            .parse()
            .map_err(EngineError::from)
    };
    let beta_hidden = next_f32()?;
    let beta_output = next_f32()?;

    let total_floats = n_input * n_hidden + n_hidden * n_output + n_hidden + n_output;
    let mut floats = Vec::with_capacity(total_floats);
    for _ in 0..total_floats {
        let line = lines
            .next()
            .ok_or_else(|| EngineError::FormatInvalid { detail: "truncated weights file: missing float".into() })??;
        floats.push(line.trim().parse::<f32>().map_err(EngineError::from)?);
    }

    let mut cursor = floats.into_iter();
    let weight_hidden: Vec<f32> = (&mut cursor).take(n_input * n_hidden).collect();
    let weight_output: Vec<f32> = (&mut cursor).take(n_hidden * n_output).collect();
    let threshold_hidden: Vec<f32> = (&mut cursor).take(n_hidden).collect();
    let threshold_output: Vec<f32> = (&mut cursor).take(n_output).collect();

    Ok(NeuralNet {
        n_input,
        n_hidden,
        n_output,
        beta_hidden,
        beta_output,
        weight_hidden,
        weight_output,
        threshold_hidden,
        threshold_output,
    })
}

/// Parse a `gnubg.weights`-style ASCII file into the six-network family.
pub fn load_weights(text: &str) -> Result<NetworkFamily, EngineError> {
    let mut lines = text.lines().map(|l| Ok::<_, std::io::Error>(l.to_string()));
    let magic_line = lines
        .next()
        .ok_or_else(|| EngineError::FormatInvalid { detail: "empty weights file".into() })??;
    if !magic_line.starts_with(WEIGHTS_MAGIC) {
        return Err(EngineError::FormatInvalid { detail: "weights file missing GNU Backgammon magic".into() });
    }
    let version = magic_line.trim_start_matches(WEIGHTS_MAGIC).trim();
    if version != WEIGHTS_VERSION {
        return Err(EngineError::FormatInvalid { detail: format!("unsupported weights version {version}") });
    }

    Ok(NetworkFamily {
        contact: parse_net(&mut lines)?,
        race: parse_net(&mut lines)?,
        crashed: parse_net(&mut lines)?,
        prune_contact: parse_net(&mut lines)?,
        prune_crashed: parse_net(&mut lines)?,
        prune_race: parse_net(&mut lines)?,
    })
}

/// Read and parse a weights file from disk.
pub fn load_weights_file(path: &std::path::Path) -> Result<NetworkFamily, EngineError> {
    let text = std::fs::read_to_string(path).map_err(|_| EngineError::IoMissing { path: path.to_path_buf() })?;
    load_weights(&text)
}

/// A zero-weight network of the given shape, for tests (and
/// [`crate::Engine::for_testing`]) that only need a `NetworkFamily` value to
/// exist without a real weights file on disk.
pub(crate) fn zero_net(n_input: usize, n_hidden: usize, n_output: usize) -> NeuralNet {
    NeuralNet {
        n_input,
        n_hidden,
        n_output,
        beta_hidden: 1.0,
        beta_output: 1.0,
        weight_hidden: vec![0.0; n_input * n_hidden],
        weight_output: vec![0.0; n_hidden * n_output],
        threshold_hidden: vec![0.0; n_hidden],
        threshold_output: vec![0.0; n_output],
    }
}

pub(crate) fn zero_family() -> NetworkFamily {
    NetworkFamily {
        contact: zero_net(250, 10, 5),
        race: zero_net(214, 10, 5),
        crashed: zero_net(250, 10, 5),
        // Pruning nets score `inputs::prune_inputs`'s 200-feature vector
        // (spec §4.3), not the full per-class input count; output count
        // still matches the five raw-output slots like the full nets.
        prune_contact: zero_net(200, 4, 5),
        prune_race: zero_net(200, 4, 5),
        prune_crashed: zero_net(200, 4, 5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_net(n_input: usize, n_hidden: usize, n_output: usize) -> NeuralNet {
        NeuralNet {
            n_input,
            n_hidden,
            n_output,
            beta_hidden: 1.0,
            beta_output: 1.0,
            weight_hidden: vec![0.1; n_input * n_hidden],
            weight_output: vec![0.2; n_hidden * n_output],
            threshold_hidden: vec![0.0; n_hidden],
            threshold_output: vec![0.0; n_output],
        }
    }

    #[test]
    fn from_base_matches_a_full_evaluation_after_a_single_input_change() {
        let net = toy_net(4, 3, 2);
        let input_a = vec![1.0, 0.0, 1.0, 0.0];
        let mut base = EvalBase::default();
        let _ = net.evaluate_save(&input_a, &mut base);

        let mut input_b = input_a.clone();
        input_b[1] = 1.0;

        let incremental = net.evaluate_from_base(&input_b, &base);
        let full = net.evaluate(&input_b);
        for (a, b) in incremental.iter().zip(full.iter()) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        let net = toy_net(2, 2, 1);
        let input = vec![0.5, 0.25];
        let mut base = EvalBase::default();
        let saved = net.evaluate_save(&input, &mut base);
        let resumed = net.evaluate_from_base(&input, &base);
        assert_eq!(saved, resumed);
    }

    #[test]
    fn rejects_bad_magic() {
        assert!(load_weights("not a weights file\n").is_err());
    }

    #[test]
    fn rejects_wrong_version() {
        assert!(load_weights("GNU Backgammon 0.99\n").is_err());
    }
}
