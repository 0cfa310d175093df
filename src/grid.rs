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

//! Partition a sample grid into square blocks and put it back together.
//!
//! Blocks are always laid out in row-major block order: block `i` sits at
//! block row `i / cols`, block column `i % cols`.

use ndarray::parallel::prelude::*;
use ndarray::prelude::*;
use ndarray::Zip;

use crate::error::{Result, ScrambleError};

/// A single square tile of samples.
pub type Block = Array2<u8>;

/// Round `n` up to the next multiple of `block_size`.
pub const fn padded_dim(n: usize, block_size: usize) -> usize {
    n.div_ceil(block_size) * block_size
}

/// Number of blocks covering a grid of logical shape `(h, w)`.
pub const fn block_count((h, w): (usize, usize), block_size: usize) -> usize {
    h.div_ceil(block_size) * w.div_ceil(block_size)
}

/// Pad a grid by edge replication up to a multiple of `block_size`.
///
/// An already aligned grid is copied unchanged.
pub fn pad(grid: ArrayView2<'_, u8>, block_size: usize) -> Result<Array2<u8>> {
    check_block_size(block_size)?;
    let (h, w) = grid.dim();
    if h == 0 || w == 0 {
        return Err(shape_error((h, w), block_size));
    }

    let mut out = Array2::zeros((padded_dim(h, block_size), padded_dim(w, block_size)));
    par_azip!((index (y, x), o in &mut out) {
        *o = grid[[y.min(h - 1), x.min(w - 1)]];
    });
    Ok(out)
}

/// Split an aligned grid into blocks, row-major.
pub fn split(grid: ArrayView2<'_, u8>, block_size: usize) -> Result<Vec<Block>> {
    check_block_size(block_size)?;
    let (h, w) = grid.dim();
    if h % block_size != 0 || w % block_size != 0 {
        return Err(shape_error((h, w), block_size));
    }

    Ok(grid
        .exact_chunks((block_size, block_size))
        .into_iter()
        .map(|b| b.to_owned())
        .collect())
}

/// Reassemble blocks into a grid and crop it to `shape`.
///
/// `shape` is the logical (unpadded) shape. It cannot be recovered from the
/// blocks alone, hence the explicit argument.
pub fn merge(blocks: &[Block], shape: (usize, usize), block_size: usize) -> Result<Array2<u8>> {
    check_block_size(block_size)?;
    let (h, w) = shape;
    let expected = block_count(shape, block_size);
    if blocks.len() != expected {
        return Err(ScrambleError::ShapeMismatch {
            expected,
            actual: blocks.len(),
        });
    }
    if let Some(b) = blocks.iter().find(|b| b.dim() != (block_size, block_size)) {
        return Err(shape_error(b.dim(), block_size));
    }

    let mut canvas = Array2::zeros((padded_dim(h, block_size), padded_dim(w, block_size)));
    let cols = canvas.ncols() / block_size;
    Zip::indexed(canvas.exact_chunks_mut((block_size, block_size))).par_for_each(
        |(r, c), mut dst| {
            dst.assign(&blocks[r * cols + c]);
        },
    );

    if canvas.dim() == shape {
        Ok(canvas)
    } else {
        Ok(canvas.slice(s![..h, ..w]).to_owned())
    }
}

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(ScrambleError::Config("block size must be non-zero".into()));
    }
    Ok(())
}

fn shape_error((height, width): (usize, usize), block_size: usize) -> ScrambleError {
    ScrambleError::Shape {
        height,
        width,
        block_size,
    }
}
