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

use rand::prelude::*;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, ScrambleError};
use crate::grid::Block;

/// Flip a fair coin per block and negate the blocks that came up true.
pub fn forward<R: Rng>(blocks: Vec<Block>, random: &mut R) -> Result<(Vec<Block>, Vec<bool>)> {
    let flags: Vec<bool> = blocks.iter().map(|_| random.gen_bool(0.5)).collect();
    let out = apply(blocks, &flags)?;
    Ok((out, flags))
}

/// Negate every block whose flag is set.
///
/// Negation is its own inverse, so this also undoes [`forward`].
pub fn apply(mut blocks: Vec<Block>, flags: &[bool]) -> Result<Vec<Block>> {
    if flags.len() != blocks.len() {
        return Err(ScrambleError::InvalidKey(format!(
            "negate key has {} entries, expected {}",
            flags.len(),
            blocks.len()
        )));
    }

    blocks
        .par_iter_mut()
        .zip(flags.par_iter())
        .filter(|(_, f)| **f)
        .for_each(|(b, _)| b.mapv_inplace(|x| u8::MAX - x));

    debug!(
        blocks = blocks.len(),
        negated = flags.iter().filter(|&&f| f).count(),
        "applied sign inversion"
    );
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn negates_flagged_blocks() {
        let blocks = vec![Block::from_elem((8, 8), 100); 2];
        let out = apply(blocks, &[true, false]).unwrap();
        assert!(out[0].iter().all(|&x| x == 155));
        assert!(out[1].iter().all(|&x| x == 100));
    }

    #[test]
    fn twice_is_identity() {
        let b = Block::from_shape_fn((8, 8), |(y, x)| (y * 31 + x * 7) as u8);
        for flag in [false, true] {
            let once = apply(vec![b.clone()], &[flag]).unwrap();
            assert_eq!(apply(once, &[flag]).unwrap(), vec![b.clone()]);
        }
    }

    #[test]
    fn extremes_wrap_exactly() {
        let b = Block::from_shape_fn((8, 8), |(y, _)| if y % 2 == 0 { 0 } else { 255 });
        let out = apply(vec![b.clone()], &[true]).unwrap();
        assert_eq!(out[0], b.mapv(|x| 255 - x));
    }

    #[test]
    fn forward_is_reproducible() {
        let blocks = vec![Block::zeros((8, 8)); 64];
        let (_, a) = forward(blocks.clone(), &mut Xoshiro256StarStar::seed_from_u64(765)).unwrap();
        let (_, b) = forward(blocks, &mut Xoshiro256StarStar::seed_from_u64(765)).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().any(|&f| f) && a.iter().any(|&f| !f));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            apply(vec![Block::zeros((8, 8))], &[]),
            Err(ScrambleError::InvalidKey(_))
        ));
    }
}
