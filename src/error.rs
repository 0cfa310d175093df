// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrambleError {
    /// Grid dimensions are not a multiple of the block size.
    #[error("Grid shape [{height} {width}] is not a multiple of block size {block_size}")]
    Shape {
        height: usize,
        width: usize,
        block_size: usize,
    },

    /// Key material is structurally valid but semantically unusable.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Imported key string could not be parsed.
    #[error("Malformed key string: {0}")]
    KeyFormat(String),

    /// Grid block count disagrees with the key.
    #[error("Grid has {actual} blocks, but key was recorded for {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Same block count as the key, but the grid is laid out differently.
    #[error(
        "Grid shape [{} {}] does not match the padded shape [{} {}] recorded in the key",
        .actual.0, .actual.1, .expected.0, .expected.1
    )]
    LayoutMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ScrambleError>;
