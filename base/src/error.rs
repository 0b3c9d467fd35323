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

//! The engine's single error type, covering every failure mode in the
//! component designs: missing files, malformed data, bad caller arguments,
//! and internal invariant violations.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum EngineError {
    /// A required file was absent from the data directory at `init` time.
    IoMissing { path: PathBuf },
    /// A file was present but its contents didn't parse: bad header, wrong
    /// version, truncated payload, or an out-of-range field.
    FormatInvalid { detail: String },
    /// A caller-supplied argument was invalid: bad dice, bad cube value,
    /// inconsistent score.
    ArgInvalid { detail: String },
    /// An internal invariant was violated. Only ever raised as an assertion;
    /// never something a caller can recover from.
    InternalInvariant { detail: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::IoMissing { path } => {
                write!(f, "required file missing: {}", path.display())
            }
            EngineError::FormatInvalid { detail } => write!(f, "invalid data format: {detail}"),
            EngineError::ArgInvalid { detail } => write!(f, "invalid argument: {detail}"),
            EngineError::InternalInvariant { detail } => {
                write!(f, "internal invariant violated: {detail}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::FormatInvalid { detail: e.to_string() }
    }
}

impl From<std::num::ParseIntError> for EngineError {
    fn from(e: std::num::ParseIntError) -> Self {
        EngineError::FormatInvalid { detail: e.to_string() }
    }
}

impl From<std::num::ParseFloatError> for EngineError {
    fn from(e: std::num::ParseFloatError) -> Self {
        EngineError::FormatInvalid { detail: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_the_detail() {
        let e = EngineError::ArgInvalid { detail: "dice out of range".into() };
        assert!(format!("{e}").contains("dice out of range"));
    }
}
