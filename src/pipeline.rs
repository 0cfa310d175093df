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

use ndarray::prelude::*;
use tracing::{debug, debug_span};

use crate::config::Config;
use crate::error::{Result, ScrambleError};
use crate::grid::{self, padded_dim};
use crate::key::TransformKey;
use crate::stage::{geometric, mask, permute, sign, Stage};

/// Keyed block scrambler.
///
/// Encode runs the enabled stages in configured order and records each
/// stage's key. Decode walks the recorded stages backwards.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scramble a block-aligned grid.
    ///
    /// Output has the same shape as the input.
    pub fn encode(&self, grid: ArrayView2<'_, u8>) -> Result<(Array2<u8>, TransformKey)> {
        let block_size = self.config.block_size();
        let _span = debug_span!("encode", shape = ?grid.dim(), block_size).entered();

        let mut blocks = grid::split(grid, block_size)?;
        let mut key = TransformKey::new(grid.dim(), block_size);

        for stage in self.config.enabled() {
            let mut random = stage.rng(self.config.seed());
            blocks = match stage {
                Stage::Mask => {
                    let threshold = self.config.variance_threshold();
                    let (b, k) = mask::forward(blocks, threshold, &mut random)?;
                    key.xor = Some(k);
                    b
                }
                Stage::Permute => {
                    let (b, k) = permute::forward(blocks, &mut random)?;
                    key.permutation = Some(k);
                    b
                }
                Stage::Geometric => {
                    let (b, k) = geometric::forward(blocks, &mut random)?;
                    key.orientations = Some(k);
                    b
                }
                Stage::Sign => {
                    let (b, k) = sign::forward(blocks, &mut random)?;
                    key.negate = Some(k);
                    b
                }
            };
            key.stages.push(stage);
        }

        debug!(stages = ?key.stages, "encoded");
        let out = grid::merge(&blocks, grid.dim(), block_size)?;
        Ok((out, key))
    }

    /// Pad by edge replication, then [`encode`](Self::encode).
    ///
    /// The key keeps the unpadded shape so decoding crops back to it.
    pub fn encode_unpadded(&self, grid: ArrayView2<'_, u8>) -> Result<(Array2<u8>, TransformKey)> {
        let padded = grid::pad(grid, self.config.block_size())?;
        let (out, mut key) = self.encode(padded.view())?;
        (key.height, key.width) = grid.dim();
        Ok((out, key))
    }

    /// Undo an encode given its key.
    ///
    /// Only the key matters here, so any pipeline can decode any key.
    pub fn decode(&self, grid: ArrayView2<'_, u8>, key: &TransformKey) -> Result<Array2<u8>> {
        decode(grid, key)
    }
}

/// Undo an encode given its key.
///
/// `grid` must have the padded shape the key was recorded for; the result
/// is cropped to the key's logical shape.
pub fn decode(grid: ArrayView2<'_, u8>, key: &TransformKey) -> Result<Array2<u8>> {
    key.validate()?;

    let block_size = key.block_size;
    let _span = debug_span!("decode", shape = ?grid.dim(), block_size).entered();

    let (h, w) = key.shape();
    let padded = (padded_dim(h, block_size), padded_dim(w, block_size));
    if grid.dim() != padded {
        let expected = key.block_count();
        let actual = grid::block_count(grid.dim(), block_size);
        return Err(if expected == actual {
            ScrambleError::LayoutMismatch {
                expected: padded,
                actual: grid.dim(),
            }
        } else {
            ScrambleError::ShapeMismatch { expected, actual }
        });
    }

    let mut blocks = grid::split(grid, block_size)?;
    for &stage in key.stages.iter().rev() {
        blocks = match stage {
            Stage::Mask => mask::apply(blocks, field(&key.xor, stage)?)?,
            Stage::Permute => permute::inverse(blocks, field(&key.permutation, stage)?)?,
            Stage::Geometric => geometric::inverse(blocks, field(&key.orientations, stage)?)?,
            Stage::Sign => sign::apply(blocks, field(&key.negate, stage)?)?,
        };
    }

    debug!(stages = ?key.stages, "decoded");
    grid::merge(&blocks, key.shape(), block_size)
}

fn field<T>(f: &Option<Vec<T>>, stage: Stage) -> Result<&[T]> {
    f.as_deref()
        .ok_or_else(|| ScrambleError::InvalidKey(format!("missing {stage} key")))
}
