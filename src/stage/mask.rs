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

//! Variance-adaptive XOR masking.
//!
//! Each block gets one scalar mask XORed into all of its samples. Flat
//! blocks (variance below the threshold) get a 2-bit mask so they stay
//! compressible; detailed blocks get a 4-bit one. The variance is only
//! measured while encoding. Decoding replays the recorded masks.

use ndarray::prelude::*;
use rand::prelude::*;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::{Result, ScrambleError};
use crate::grid::Block;

/// Exclusive upper bound of the mask for low-variance blocks.
pub const NARROW_RANGE: u8 = 4;
/// Exclusive upper bound of the mask for everything else.
pub const WIDE_RANGE: u8 = 16;

/// Population variance of a block's samples.
pub fn variance(block: ArrayView2<'_, u8>) -> f64 {
    if block.is_empty() {
        return 0.0;
    }
    block.mapv(f64::from).var(0.0)
}

/// Exclusive upper bound for the mask of a block with the given variance.
pub fn mask_range(variance: f64, threshold: f64) -> u8 {
    if variance < threshold {
        NARROW_RANGE
    } else {
        WIDE_RANGE
    }
}

/// Draw a mask per block, sized by its variance, and XOR it in.
pub fn forward<R: Rng>(
    blocks: Vec<Block>,
    threshold: f64,
    random: &mut R,
) -> Result<(Vec<Block>, Vec<u8>)> {
    let ranges: Vec<u8> = blocks
        .par_iter()
        .map(|b| mask_range(variance(b.view()), threshold))
        .collect();

    trace!(
        narrow = ranges.iter().filter(|&&r| r == NARROW_RANGE).count(),
        wide = ranges.iter().filter(|&&r| r == WIDE_RANGE).count(),
        "mask widths"
    );

    // Sequential so the draws follow block order.
    let masks: Vec<u8> = ranges.iter().map(|&r| random.gen_range(0..r)).collect();

    let out = apply(blocks, &masks)?;
    Ok((out, masks))
}

/// XOR each block with its mask. Self-inverse.
pub fn apply(mut blocks: Vec<Block>, masks: &[u8]) -> Result<Vec<Block>> {
    if masks.len() != blocks.len() {
        return Err(ScrambleError::InvalidKey(format!(
            "xor key has {} entries, expected {}",
            masks.len(),
            blocks.len()
        )));
    }

    blocks
        .par_iter_mut()
        .zip(masks.par_iter())
        .for_each(|(b, &m)| b.mapv_inplace(|x| x ^ m));

    debug!(blocks = blocks.len(), "applied intensity mask");
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_xoshiro::Xoshiro256StarStar;

    const THRESHOLD: f64 = 50.0;

    fn checker(lo: u8, hi: u8) -> Block {
        Block::from_shape_fn((8, 8), |(y, x)| if (y + x) % 2 == 0 { lo } else { hi })
    }

    #[test]
    fn variance_matches_population_formula() {
        assert_eq!(variance(Block::from_elem((8, 8), 100).view()), 0.0);
        // Half 0, half 20: mean 10, every deviation is 10.
        assert!((variance(checker(0, 20).view()) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn width_policy() {
        assert_eq!(mask_range(0.0, THRESHOLD), NARROW_RANGE);
        assert_eq!(mask_range(49.999, THRESHOLD), NARROW_RANGE);
        assert_eq!(mask_range(50.0, THRESHOLD), WIDE_RANGE);
        assert_eq!(mask_range(1e6, THRESHOLD), WIDE_RANGE);
    }

    #[test]
    fn flat_blocks_get_narrow_masks() {
        // Variance 49: just under the threshold.
        let flat = checker(93, 107);
        assert!(variance(flat.view()) < THRESHOLD);
        let blocks = vec![flat; 256];
        let mut rng = Xoshiro256StarStar::seed_from_u64(765);
        let (_, masks) = forward(blocks, THRESHOLD, &mut rng).unwrap();
        assert!(masks.iter().all(|&m| m < NARROW_RANGE));
    }

    #[test]
    fn busy_blocks_get_wide_masks() {
        let busy = checker(0, 200);
        let blocks = vec![busy; 256];
        let mut rng = Xoshiro256StarStar::seed_from_u64(765);
        let (_, masks) = forward(blocks, THRESHOLD, &mut rng).unwrap();
        assert!(masks.iter().all(|&m| m < WIDE_RANGE));
        assert!(masks.iter().any(|&m| m >= NARROW_RANGE));
    }

    #[test]
    fn xor_twice_is_identity() {
        let b = checker(3, 250);
        for m in 0..WIDE_RANGE {
            let once = apply(vec![b.clone()], &[m]).unwrap();
            assert_eq!(apply(once, &[m]).unwrap()[0], b);
        }
    }

    #[test]
    fn forward_then_apply_restores() {
        let blocks: Vec<Block> = (0..16u8).map(|i| checker(i, i.wrapping_mul(15))).collect();
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        let (out, masks) = forward(blocks.clone(), THRESHOLD, &mut rng).unwrap();
        assert_eq!(apply(out, &masks).unwrap(), blocks);
    }
}
