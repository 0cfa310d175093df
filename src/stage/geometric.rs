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

//! Per-block rotation and flip.
//!
//! Forward rotates first and flips second, so the inverse must undo the flip
//! before undoing the rotation.

use ndarray::prelude::*;
use rand::prelude::*;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, ScrambleError};
use crate::grid::Block;

/// Mirror applied after rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flip {
    #[default]
    None,
    /// Mirror columns (left-right).
    Horizontal,
    /// Mirror rows (up-down).
    Vertical,
}

impl Flip {
    pub const ALL: [Flip; 3] = [Flip::None, Flip::Horizontal, Flip::Vertical];

    pub const fn code(self) -> u8 {
        match self {
            Flip::None => 0,
            Flip::Horizontal => 1,
            Flip::Vertical => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// Geometric key of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Orientation {
    /// Counter-clockwise quarter turns, `0..4`.
    pub rotation: u8,
    pub flip: Flip,
}

impl Orientation {
    pub fn new(rotation: u8, flip: Flip) -> Result<Self> {
        if rotation > 3 {
            return Err(ScrambleError::InvalidKey(format!(
                "rotation {rotation} out of range 0..4"
            )));
        }
        Ok(Self { rotation, flip })
    }

    /// Every valid orientation.
    pub fn all() -> impl Iterator<Item = Orientation> {
        (0..4).flat_map(|rotation| {
            Flip::ALL
                .into_iter()
                .map(move |flip| Orientation { rotation, flip })
        })
    }

    /// Pack into one byte: rotation in bits 0-1, flip in bits 2-3.
    pub const fn pack(self) -> u8 {
        self.rotation | (self.flip.code() << 2)
    }

    pub fn unpack(byte: u8) -> Option<Self> {
        if byte >> 4 != 0 {
            return None;
        }
        Some(Self {
            rotation: byte & 0b11,
            flip: Flip::from_code(byte >> 2)?,
        })
    }
}

/// Draw an orientation per block, then rotate and flip each one.
pub fn forward<R: Rng>(
    blocks: Vec<Block>,
    random: &mut R,
) -> Result<(Vec<Block>, Vec<Orientation>)> {
    if let Some(b) = blocks.iter().find(|b| !b.is_square()) {
        let (height, width) = b.dim();
        return Err(ScrambleError::Shape {
            height,
            width,
            block_size: height.min(width),
        });
    }

    // Draws happen in block order so the key lines up with block indices.
    let key: Vec<Orientation> = blocks
        .iter()
        .map(|_| Orientation {
            rotation: random.gen_range(0..4),
            flip: Flip::ALL[random.gen_range(0..3)],
        })
        .collect();

    let out = blocks
        .into_par_iter()
        .zip(key.par_iter())
        .map(|(b, &o)| apply(b.view(), o))
        .collect();

    debug!(blocks = key.len(), "rotated and flipped blocks");
    Ok((out, key))
}

/// Undo [`forward`] given its key.
pub fn inverse(blocks: Vec<Block>, key: &[Orientation]) -> Result<Vec<Block>> {
    if key.len() != blocks.len() {
        return Err(ScrambleError::InvalidKey(format!(
            "orientation key has {} entries, expected {}",
            key.len(),
            blocks.len()
        )));
    }

    let out: Vec<Block> = blocks
        .into_par_iter()
        .zip(key.par_iter())
        .map(|(b, &o)| undo(b.view(), o))
        .collect();

    debug!(blocks = out.len(), "undid block rotation and flip");
    Ok(out)
}

/// Rotate `o.rotation` quarter turns counter-clockwise, then flip.
pub fn apply(block: ArrayView2<'_, u8>, o: Orientation) -> Block {
    let v = flip(rotate(block, o.rotation), o.flip);
    v.as_standard_layout().into_owned()
}

/// Undo the flip, then rotate back.
pub fn undo(block: ArrayView2<'_, u8>, o: Orientation) -> Block {
    let v = rotate(flip(block, o.flip), (4 - o.rotation % 4) % 4);
    v.as_standard_layout().into_owned()
}

fn rotate(mut v: ArrayView2<'_, u8>, quarter_turns: u8) -> ArrayView2<'_, u8> {
    for _ in 0..quarter_turns % 4 {
        // One counter-clockwise turn: mirror columns, then transpose.
        v.invert_axis(Axis(1));
        v = v.reversed_axes();
    }
    v
}

fn flip(mut v: ArrayView2<'_, u8>, f: Flip) -> ArrayView2<'_, u8> {
    match f {
        Flip::None => {}
        Flip::Horizontal => v.invert_axis(Axis(1)),
        Flip::Vertical => v.invert_axis(Axis(0)),
    }
    v
}
