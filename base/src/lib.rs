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

//! Shared data types used across the whole engine: the board representation,
//! position keys, dice, moves, the move generator, the position classifier,
//! cube/match state, and the combinatorial reference tables everything else
//! is built from.

mod board;
pub use board::{Board, Player, Variation, BAR, POINTS};

mod position;
pub use position::PositionKey;

mod dice;
pub use dice::{Dice, ALL_ROLLS};

mod moves;
pub use moves::{Move, MoveList, Ply, RawOutput, SubMove};

pub mod movegen;
pub use movegen::generate_moves;

mod classify;
pub use classify::{classify, BearoffAvailability, PositionClass};

mod cubeinfo;
pub use cubeinfo::{CrawfordState, CubeInfo, CubeOwner, EvalContext};

pub mod tables;

pub mod matchequity;

mod error;
pub use error::EngineError;
