//! Library to reversibly scramble a grayscale image block by block.
//!
//! The sample grid is cut into square blocks, which then pass through a
//! chain of seeded, reversible stages:
//!
//! * Variance-adaptive XOR masking ([`stage::mask`]).
//! * Whole-block permutation ([`stage::permute`]).
//! * Per-block rotation and flip ([`stage::geometric`]).
//! * Per-block negation ([`stage::sign`]).
//!
//! Every stage records the choices it made in a [`TransformKey`], and
//! [`decode`] replays that key backwards to get the exact original grid.
//! The randomness is seeded and reproducible. It is not a secret.
//!
//! ```
//! use blockscramble::{Config, Pipeline, TransformKey};
//! use ndarray::Array2;
//!
//! let grid = Array2::from_shape_fn((16, 24), |(y, x)| (y * 24 + x) as u8);
//! let pipeline = Pipeline::new(Config::default());
//!
//! let (scrambled, key) = pipeline.encode(grid.view())?;
//! let key = TransformKey::import(&key.export()?)?;
//! assert_eq!(pipeline.decode(scrambled.view(), &key)?, grid);
//! # Ok::<(), blockscramble::ScrambleError>(())
//! ```

// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//

pub mod config;
pub mod error;
pub mod grid;
pub mod key;
pub mod pipeline;
pub mod stage;

#[doc(inline)]
pub use crate::config::{Config, ConfigBuilder, BLOCK_SIZE, DEFAULT_SEED, VARIANCE_THRESHOLD};
#[doc(inline)]
pub use crate::error::{Result, ScrambleError};
#[doc(inline)]
pub use crate::key::TransformKey;
#[doc(inline)]
pub use crate::pipeline::{decode, Pipeline};
#[doc(inline)]
pub use crate::stage::{Stage, StageMask};
