//! Ensemble update pass (`spec.md` §4.6, boosting driver step 6): folds the
//! round's freshly-fit tree for class `k` into `TREE[k]` for every row in
//! the frame, in-bag or not.
//!
//! Rows are scored by walking the tree from its root using each row's live
//! feature values ([`score_through_tree`]) rather than by reading `NIDS`,
//! which only tracks in-bag routing during layer construction — OOB rows
//! are never assigned a layer id, so `NIDS` alone can't answer "what would
//! this tree predict for this row". Re-walking from the root gives every
//! row, bagged or not, a correct updated running prediction for the next
//! round's residual pass.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::gbm::frame::ChunkedFrame;
use crate::gbm::tree::{DTree, Node};

fn score_through_tree(frame: &ChunkedFrame, tree: &DTree, row: usize) -> f64 {
    let mut nid = tree.root();
    loop {
        match tree.node(nid) {
            Node::Leaf { prediction } => return *prediction,
            Node::Undecided { .. } => return 0.0,
            Node::Decided { .. } => {
                nid = tree.route(nid, |c| {
                    let v = frame.feature_value(c, row);
                    if v.is_nan() {
                        None
                    } else {
                        Some(v)
                    }
                });
            }
        }
    }
}

/// Seeds a per-row RNG independent of the parallel iteration order, so
/// `pred_noise_bandwidth` noise reproduces exactly under the same
/// `(seed, round, k)` regardless of how the row range was partitioned.
fn row_seeded_rng(seed: u64, round: usize, k: usize, row: usize) -> ChaCha8Rng {
    let mixed = seed
        .wrapping_mul(0x9E3779B97F4A7C15)
        .wrapping_add((round as u64).wrapping_mul(0xBF58476D1CE4E5B9))
        .wrapping_add((k as u64).wrapping_mul(0x94D049BB133111EB))
        .wrapping_add((row as u64).wrapping_mul(0xD6E8FEB86659FD93))
        .wrapping_add(0x5EED);
    ChaCha8Rng::seed_from_u64(mixed)
}

/// Standard Box-Muller transform, manually written (no distribution crate
/// dependency) since only one normal sample per row is ever needed.
fn gaussian_noise(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Adds `learn_rate * (tree's prediction [+ noise])` into `TREE[k]` for
/// every row. The per-row delta is truncated to 32-bit float precision
/// before being added (spec.md §4.6), matching the reference engine's
/// reduced-precision ensemble so two runs at the same seed stay bit-for-bit
/// reproducible regardless of floating-point summation order.
pub fn update_ensemble(
    frame: &mut ChunkedFrame,
    tree: &DTree,
    k: usize,
    learn_rate: f64,
    pred_noise_bandwidth: f64,
    seed: u64,
    round: usize,
) {
    let num_rows = frame.num_rows();
    let deltas: Vec<f64> = (0..num_rows)
        .into_par_iter()
        .map(|row| {
            let raw = score_through_tree(frame, tree, row);
            let noisy = if pred_noise_bandwidth > 0.0 {
                let mut rng = row_seeded_rng(seed, round, k, row);
                raw + pred_noise_bandwidth * gaussian_noise(&mut rng)
            } else {
                raw
            };
            let delta = learn_rate * noisy;
            delta as f32 as f64
        })
        .collect();

    let tree_col = frame.tree_mut(k);
    for (row, delta) in deltas.into_iter().enumerate() {
        tree_col.add_to(row, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbm::frame::Column;
    use crate::gbm::tree::{DTree, NaDirection, SplitPredicate};

    fn toy_frame() -> ChunkedFrame {
        let x1 = Column::numeric(vec![vec![-1.0, 1.0]]);
        let y = Column::numeric(vec![vec![0.0, 0.0]]);
        ChunkedFrame::new(vec![x1], y, None, 1).unwrap()
    }

    fn split_tree() -> DTree {
        let mut tree = DTree::with_root(vec![]);
        tree.decide(
            0,
            SplitPredicate::Threshold { column: 0, threshold: 0.0 },
            NaDirection::Left,
            vec![],
            vec![],
        );
        tree.make_leaf(1);
        tree.make_leaf(2);
        if let Node::Leaf { prediction } = tree.node_mut(1) {
            *prediction = -5.0;
        }
        if let Node::Leaf { prediction } = tree.node_mut(2) {
            *prediction = 5.0;
        }
        tree
    }

    #[test]
    fn every_row_is_scored_through_the_tree_regardless_of_nids() {
        let mut frame = toy_frame();
        let tree = split_tree();
        update_ensemble(&mut frame, &tree, 0, 1.0, 0.0, 0, 1);
        assert_eq!(frame.tree(0).get(0), -5.0);
        assert_eq!(frame.tree(0).get(1), 5.0);
    }

    #[test]
    fn learn_rate_scales_the_update() {
        let mut frame = toy_frame();
        let tree = split_tree();
        update_ensemble(&mut frame, &tree, 0, 0.1, 0.0, 0, 1);
        assert!((frame.tree(0).get(0) - (-0.5)).abs() < 1e-5);
    }

    #[test]
    fn zero_noise_bandwidth_is_deterministic_across_runs() {
        let mut a = toy_frame();
        let mut b = toy_frame();
        let tree = split_tree();
        update_ensemble(&mut a, &tree, 0, 0.5, 0.0, 42, 3);
        update_ensemble(&mut b, &tree, 0, 0.5, 0.0, 42, 3);
        assert_eq!(a.tree(0).get(0), b.tree(0).get(0));
        assert_eq!(a.tree(0).get(1), b.tree(0).get(1));
    }
}
