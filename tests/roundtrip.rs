//! Property-based tests for the scrambling pipeline using proptest.

use blockscramble::grid::{self, Block};
use blockscramble::stage::geometric::{self, Flip, Orientation};
use blockscramble::stage::{mask, permute, sign};
use blockscramble::{Config, Pipeline, Stage, StageMask, TransformKey};
use ndarray::Array2;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

/// Block-aligned grid of 1..4 x 1..4 blocks of edge 8.
fn aligned_grid() -> impl Strategy<Value = Array2<u8>> {
    (1usize..4, 1usize..4).prop_flat_map(|(br, bc)| {
        let (h, w) = (br * 8, bc * 8);
        proptest::collection::vec(any::<u8>(), h * w)
            .prop_map(move |v| Array2::from_shape_vec((h, w), v).unwrap())
    })
}

/// Grid of arbitrary (non-empty) shape.
fn any_grid() -> impl Strategy<Value = Array2<u8>> {
    (1usize..30, 1usize..30).prop_flat_map(|(h, w)| {
        proptest::collection::vec(any::<u8>(), h * w)
            .prop_map(move |v| Array2::from_shape_vec((h, w), v).unwrap())
    })
}

fn any_block() -> impl Strategy<Value = Block> {
    proptest::collection::vec(any::<u8>(), 64)
        .prop_map(|v| Array2::from_shape_vec((8, 8), v).unwrap())
}

fn any_orientation() -> impl Strategy<Value = Orientation> {
    (0u8..4, prop_oneof![
        Just(Flip::None),
        Just(Flip::Horizontal),
        Just(Flip::Vertical)
    ])
        .prop_map(|(r, f)| Orientation::new(r, f).unwrap())
}

fn any_key() -> impl Strategy<Value = TransformKey> {
    (1usize..40, 1usize..40, 0u8..16).prop_flat_map(|(h, w, bits)| {
        let base = TransformKey::new((h, w), 8);
        let n = base.block_count();
        let enabled = StageMask::from_bits(bits).unwrap();
        (
            Just(base),
            Just(enabled),
            proptest::collection::vec(0u8..16, n),
            Just((0..n as u32).collect::<Vec<_>>()).prop_shuffle(),
            proptest::collection::vec(any_orientation(), n),
            proptest::collection::vec(any::<bool>(), n),
        )
            .prop_map(|(base, enabled, xor, perm, orient, neg)| TransformKey {
                stages: enabled.stages().collect(),
                xor: enabled.contains(Stage::Mask).then_some(xor),
                permutation: enabled.contains(Stage::Permute).then_some(perm),
                orientations: enabled.contains(Stage::Geometric).then_some(orient),
                negate: enabled.contains(Stage::Sign).then_some(neg),
                ..base
            })
    })
}

proptest! {
    #[test]
    fn pipeline_roundtrips_every_mask(g in aligned_grid(), bits in 0u8..16, seed in any::<u64>()) {
        let config = Config::builder()
            .seed(seed)
            .stages(StageMask::from_bits(bits).unwrap())
            .build()
            .unwrap();
        let p = Pipeline::new(config);
        let (out, key) = p.encode(g.view()).unwrap();
        prop_assert_eq!(out.dim(), g.dim());
        prop_assert_eq!(p.decode(out.view(), &key).unwrap(), g);
    }

    #[test]
    fn unpadded_grids_roundtrip(g in any_grid()) {
        let p = Pipeline::default();
        let (out, key) = p.encode_unpadded(g.view()).unwrap();
        prop_assert_eq!(out.nrows() % 8, 0);
        prop_assert_eq!(out.ncols() % 8, 0);
        let restored = TransformKey::import(&key.export().unwrap()).unwrap();
        prop_assert_eq!(p.decode(out.view(), &restored).unwrap(), g);
    }

    #[test]
    fn permutation_is_bijection(n in 0usize..300, seed in any::<u64>()) {
        let blocks: Vec<Block> = (0..n).map(|i| Block::from_elem((8, 8), i as u8)).collect();
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        let (out, key) = permute::forward(blocks.clone(), &mut rng).unwrap();

        let mut sorted = key.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..n as u32).collect::<Vec<_>>());
        prop_assert!(permute::validate(&key, n).is_ok());
        prop_assert_eq!(permute::inverse(out, &key).unwrap(), blocks);
    }

    #[test]
    fn geometric_undo_inverts_apply(b in any_block(), o in any_orientation()) {
        let t = geometric::apply(b.view(), o);
        prop_assert_eq!(geometric::undo(t.view(), o), b);
    }

    #[test]
    fn sign_is_self_inverse(b in any_block(), flag in any::<bool>()) {
        let once = sign::apply(vec![b.clone()], &[flag]).unwrap();
        prop_assert_eq!(sign::apply(once, &[flag]).unwrap(), vec![b]);
    }

    #[test]
    fn xor_is_self_inverse(b in any_block(), m in any::<u8>()) {
        let once = mask::apply(vec![b.clone()], &[m]).unwrap();
        prop_assert_eq!(mask::apply(once, &[m]).unwrap(), vec![b]);
    }

    #[test]
    fn mask_width_follows_variance(b in any_block(), seed in any::<u64>()) {
        let var = mask::variance(b.view());
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        let (_, masks) = mask::forward(vec![b], 50.0, &mut rng).unwrap();
        if var < 50.0 {
            prop_assert!(masks[0] < 4);
        } else {
            prop_assert!(masks[0] < 16);
        }
    }

    #[test]
    fn key_export_roundtrips(k in any_key()) {
        prop_assert!(k.validate().is_ok());
        let s = k.export().unwrap();
        prop_assert_eq!(TransformKey::import(&s).unwrap(), k);
    }

    #[test]
    fn split_merge_roundtrip(g in any_grid()) {
        let padded = grid::pad(g.view(), 8).unwrap();
        let blocks = grid::split(padded.view(), 8).unwrap();
        prop_assert_eq!(grid::merge(&blocks, g.dim(), 8).unwrap(), g);
    }
}
