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
use tracing::debug;

use crate::error::{Result, ScrambleError};
use crate::grid::Block;

/// Shuffle whole blocks.
///
/// The ordering depends only on the block count and the random stream,
/// never on block content. Output position `i` holds input block `key[i]`.
pub fn forward<R: Rng>(blocks: Vec<Block>, random: &mut R) -> Result<(Vec<Block>, Vec<u32>)> {
    let n = u32::try_from(blocks.len())
        .map_err(|_| ScrambleError::InvalidKey(format!("too many blocks ({})", blocks.len())))?;

    let mut indices: Vec<u32> = (0..n).collect();
    indices.shuffle(random);

    let out = gather(blocks, &indices);
    debug!(blocks = out.len(), "permuted blocks");
    Ok((out, indices))
}

/// Scatter blocks back to where `key` says they came from.
///
/// Works for any bijection over `[0, N)`, not only ones made by [`forward`].
pub fn inverse(blocks: Vec<Block>, key: &[u32]) -> Result<Vec<Block>> {
    validate(key, blocks.len())?;

    let mut slots: Vec<Option<Block>> = vec![None; blocks.len()];
    for (block, &src) in blocks.into_iter().zip(key) {
        slots[src as usize] = Some(block);
    }

    debug!(blocks = slots.len(), "restored block order");
    Ok(slots.into_iter().flatten().collect())
}

/// Check that `key` is a total permutation of `[0, n)`.
pub fn validate(key: &[u32], n: usize) -> Result<()> {
    if key.len() != n {
        return Err(ScrambleError::InvalidKey(format!(
            "permutation has {} entries, expected {n}",
            key.len()
        )));
    }

    let mut seen = vec![false; n];
    for &i in key {
        match seen.get_mut(i as usize) {
            Some(s) if !*s => *s = true,
            Some(_) => {
                return Err(ScrambleError::InvalidKey(format!(
                    "permutation repeats index {i}"
                )))
            }
            None => {
                return Err(ScrambleError::InvalidKey(format!(
                    "permutation index {i} out of range 0..{n}"
                )))
            }
        }
    }
    Ok(())
}

// Moves each block exactly once; `indices` must already be a bijection.
fn gather(blocks: Vec<Block>, indices: &[u32]) -> Vec<Block> {
    let mut slots: Vec<Option<Block>> = blocks.into_iter().map(Some).collect();

    indices
        .iter()
        .filter_map(|&i| slots[i as usize].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_xoshiro::Xoshiro256StarStar;

    fn tagged(n: usize) -> Vec<Block> {
        (0..n).map(|i| Block::from_elem((8, 8), i as u8)).collect()
    }

    #[test]
    fn forward_moves_blocks_by_key() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(765);
        let (out, key) = forward(tagged(20), &mut rng).unwrap();
        for (i, &src) in key.iter().enumerate() {
            assert_eq!(out[i][[0, 0]], src as u8);
        }
    }

    #[test]
    fn inverse_restores_order() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        let orig = tagged(37);
        let (out, key) = forward(orig.clone(), &mut rng).unwrap();
        assert_ne!(out, orig);
        assert_eq!(inverse(out, &key).unwrap(), orig);
    }

    #[test]
    fn ordering_ignores_content() {
        let a: Vec<Block> = (0..12).map(|_| Block::zeros((8, 8))).collect();
        let (_, ka) = forward(a, &mut Xoshiro256StarStar::seed_from_u64(9)).unwrap();
        let (_, kb) = forward(tagged(12), &mut Xoshiro256StarStar::seed_from_u64(9)).unwrap();
        assert_eq!(ka, kb);
    }

    #[test]
    fn inverse_accepts_foreign_bijection() {
        let key = [2, 0, 1];
        let shuffled = vec![
            Block::from_elem((8, 8), 2),
            Block::from_elem((8, 8), 0),
            Block::from_elem((8, 8), 1),
        ];
        assert_eq!(inverse(shuffled, &key).unwrap(), tagged(3));
    }

    #[test]
    fn rejects_non_bijection() {
        assert!(matches!(
            inverse(tagged(3), &[0, 0, 1]),
            Err(ScrambleError::InvalidKey(_))
        ));
        assert!(matches!(
            inverse(tagged(3), &[0, 1, 3]),
            Err(ScrambleError::InvalidKey(_))
        ));
        assert!(matches!(
            inverse(tagged(3), &[0, 1]),
            Err(ScrambleError::InvalidKey(_))
        ));
    }

    #[test]
    fn empty_sequence() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(0);
        let (out, key) = forward(Vec::new(), &mut rng).unwrap();
        assert!(out.is_empty() && key.is_empty());
    }
}
