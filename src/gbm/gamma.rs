//! Leaf-fit pass (`spec.md` §4.5, boosting driver step 5): overwrites each
//! leaf's placeholder `prediction` with the family-appropriate constant
//! fitted from the in-bag rows that landed there.
//!
//! Three mutually exclusive paths, selected by [`Distribution::needs_quantile_fit`]
//! / [`Distribution::needs_huber_fit`]:
//! - closed-form: `sum(gamma_num) / sum(gamma_denom)` across the leaf's rows.
//! - quantile (Laplace/Quantile): the weighted `quantile_alpha`-quantile (0.5
//!   for Laplace) of `y - f` over the leaf's rows.
//! - Huber: weighted median of `y - f`, then a sign-clipped correction term
//!   bounded by the round's `huber_delta` (from `gbm::residual`).
//!
//! Every fitted value is capped per `spec.md` §4.5: NaN becomes 0, infinities
//! saturate to `±1e4`, and the result is finally clamped to
//! `±max_abs_leafnode_pred`.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::gbm::distribution::{Distribution, Family};
use crate::gbm::frame::ChunkedFrame;
use crate::gbm::quantile;
use crate::gbm::tree::{DTree, Node};

const PRE_CAP: f64 = 1e4;

fn cap_prediction(value: f64, max_abs_leafnode_pred: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    let pre_capped = if value.is_infinite() {
        value.signum() * PRE_CAP
    } else {
        value.clamp(-PRE_CAP, PRE_CAP)
    };
    pre_capped.clamp(-max_abs_leafnode_pred, max_abs_leafnode_pred)
}

/// `m1class = (K-1)/K` for multinomial, 1 otherwise (spec.md §4.5's closed
/// form formula) — the standard K-class downweighting that keeps the
/// one-redundant-class softmax parameterization from overshooting.
fn m1class(distribution: Distribution, num_classes: usize) -> f64 {
    if matches!(distribution.family, Family::Multinomial) && num_classes > 1 {
        (num_classes - 1) as f64 / num_classes as f64
    } else {
        1.0
    }
}

fn closed_form_leaf_fit(
    frame: &ChunkedFrame,
    k: usize,
    distribution: Distribution,
    offset: f64,
    num_classes: usize,
    rows: &[usize],
) -> f64 {
    let mut num = 0.0;
    let mut denom = 0.0;
    for &row in rows {
        let w = frame.weight_for_row(row);
        let y = frame.response_value(row);
        let f = frame.tree(k).get(row) + offset;
        let r = frame.work(k).get(row);
        num += distribution.gamma_num(w, y, r, f);
        denom += distribution.gamma_denom(w, y, r, f);
    }
    if denom.abs() < 1e-12 {
        return 0.0;
    }
    let ratio = num / denom;
    let ratio = if distribution.truncate_log_space() {
        // Poisson/Gamma/Tweedie fit the gamma step in mean-response space;
        // `link` carries it back into the log-space the ensemble accumulates
        // (spec.md §4.5: "learn_rate × m1class × link(num/denom)").
        distribution.link(ratio)
    } else {
        ratio
    };
    m1class(distribution, num_classes) * ratio
}

fn quantile_leaf_fit(frame: &ChunkedFrame, k: usize, distribution: Distribution, offset: f64, rows: &[usize]) -> f64 {
    let q = match distribution.family {
        Family::Laplace => 0.5,
        _ => distribution.params.quantile_alpha,
    };
    let mut values = Vec::with_capacity(rows.len());
    let mut weights = Vec::with_capacity(rows.len());
    for &row in rows {
        let y = frame.response_value(row);
        let f = frame.tree(k).get(row) + offset;
        values.push(y - f);
        weights.push(frame.weight_for_row(row));
    }
    let strata = vec![0usize; values.len()];
    quantile::stratified_quantile(&values, &weights, &strata, q)
        .get(&0)
        .copied()
        .unwrap_or(0.0)
}

fn huber_leaf_fit(frame: &ChunkedFrame, k: usize, offset: f64, delta: f64, rows: &[usize]) -> f64 {
    let mut residuals = Vec::with_capacity(rows.len());
    let mut weights = Vec::with_capacity(rows.len());
    for &row in rows {
        let y = frame.response_value(row);
        let f = frame.tree(k).get(row) + offset;
        residuals.push(y - f);
        weights.push(frame.weight_for_row(row));
    }
    let strata = vec![0usize; residuals.len()];
    let median = quantile::weighted_median(&residuals, &weights, &strata)
        .get(&0)
        .copied()
        .unwrap_or(0.0);

    let mut w_sum = 0.0;
    let mut adjustment = 0.0;
    for (i, &r) in residuals.iter().enumerate() {
        let diff = r - median;
        let clipped = diff.signum() * diff.abs().min(delta);
        adjustment += weights[i] * clipped;
        w_sum += weights[i];
    }
    if w_sum <= 0.0 {
        median
    } else {
        median + adjustment / w_sum
    }
}

fn fit_one_leaf(
    frame: &ChunkedFrame,
    k: usize,
    distribution: Distribution,
    offset: f64,
    num_classes: usize,
    huber_delta: Option<f64>,
    rows: &[usize],
) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    if distribution.needs_huber_fit() {
        huber_leaf_fit(frame, k, offset, huber_delta.unwrap_or(0.0), rows)
    } else if distribution.needs_quantile_fit() {
        quantile_leaf_fit(frame, k, distribution, offset, rows)
    } else {
        closed_form_leaf_fit(frame, k, distribution, offset, num_classes, rows)
    }
}

/// Fits every leaf currently in `tree` from its in-bag rows (`NIDS[k]`
/// pointing at that leaf's id), replacing the placeholder `prediction: 0.0`
/// left by [`crate::gbm::tree::DTree::make_leaf`].
#[allow(clippy::too_many_arguments)]
pub fn fit_leaves(
    frame: &ChunkedFrame,
    tree: &mut DTree,
    k: usize,
    distribution: Distribution,
    offset: f64,
    num_classes: usize,
    huber_delta: Option<f64>,
    max_abs_leafnode_pred: f64,
) {
    let leaf_ids: Vec<usize> = (0..tree.len())
        .filter(|&id| matches!(tree.node(id), Node::Leaf { .. }))
        .collect();
    if leaf_ids.is_empty() {
        return;
    }

    let mut rows_by_leaf: HashMap<usize, Vec<usize>> = leaf_ids.iter().map(|&id| (id, Vec::new())).collect();
    for row in 0..frame.num_rows() {
        let nid = frame.nids(k).get(row);
        if nid >= 0 {
            if let Some(rows) = rows_by_leaf.get_mut(&(nid as usize)) {
                rows.push(row);
            }
        }
    }

    let predictions: Vec<(usize, f64)> = leaf_ids
        .into_par_iter()
        .map(|leaf_id| {
            let rows = &rows_by_leaf[&leaf_id];
            let raw = fit_one_leaf(frame, k, distribution, offset, num_classes, huber_delta, rows);
            (leaf_id, cap_prediction(raw, max_abs_leafnode_pred))
        })
        .collect();

    for (leaf_id, prediction) in predictions {
        if let Node::Leaf { prediction: slot } = tree.node_mut(leaf_id) {
            *slot = prediction;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbm::frame::Column;
    use crate::gbm::tree::SplitPredicate;

    fn toy_frame(y: Vec<f64>) -> ChunkedFrame {
        let n = y.len();
        let x1 = Column::numeric(vec![vec![0.0; n]]);
        let resp = Column::numeric(vec![y]);
        ChunkedFrame::new(vec![x1], resp, None, 1).unwrap()
    }

    #[test]
    fn gaussian_leaf_fit_is_the_weighted_mean_residual() {
        let mut frame = toy_frame(vec![1.0, 3.0, 5.0]);
        frame.nids_mut(0).set(0, 0);
        frame.nids_mut(0).set(1, 0);
        frame.nids_mut(0).set(2, 0);
        let mut tree = DTree::with_root(vec![]);
        tree.make_leaf(0);

        fit_leaves(&frame, &mut tree, 0, Distribution::gaussian(), 0.0, 1, None, 1e4);
        match tree.node(0) {
            Node::Leaf { prediction } => assert!((prediction - 3.0).abs() < 1e-9),
            _ => panic!("expected leaf"),
        }
    }

    #[test]
    fn laplace_leaf_fit_is_the_median() {
        let mut frame = toy_frame(vec![1.0, 2.0, 100.0]);
        for row in 0..3 {
            frame.nids_mut(0).set(row, 0);
        }
        let mut tree = DTree::with_root(vec![]);
        tree.make_leaf(0);
        let distribution = Distribution::new(Family::Laplace, crate::gbm::distribution::DistributionParams::default());

        fit_leaves(&frame, &mut tree, 0, distribution, 0.0, 1, None, 1e4);
        match tree.node(0) {
            Node::Leaf { prediction } => assert!((prediction - 2.0).abs() < 1e-9),
            _ => panic!("expected leaf"),
        }
    }

    #[test]
    fn prediction_is_capped_to_max_abs_leafnode_pred() {
        let mut frame = toy_frame(vec![1e9]);
        frame.nids_mut(0).set(0, 0);
        let mut tree = DTree::with_root(vec![]);
        tree.make_leaf(0);

        fit_leaves(&frame, &mut tree, 0, Distribution::gaussian(), 0.0, 1, None, 5.0);
        match tree.node(0) {
            Node::Leaf { prediction } => assert_eq!(*prediction, 5.0),
            _ => panic!("expected leaf"),
        }
    }

    #[test]
    fn leaves_with_no_assigned_rows_keep_zero_prediction() {
        let frame = toy_frame(vec![1.0]);
        let mut tree = DTree::with_root(vec![]);
        tree.decide(
            0,
            SplitPredicate::Threshold { column: 0, threshold: 0.0 },
            crate::gbm::tree::NaDirection::Left,
            vec![],
            vec![],
        );
        tree.make_leaf(1);
        tree.make_leaf(2);

        fit_leaves(&frame, &mut tree, 0, Distribution::gaussian(), 0.0, 1, None, 1e4);
        match tree.node(1) {
            Node::Leaf { prediction } => assert_eq!(*prediction, 0.0),
            _ => panic!("expected leaf"),
        }
    }
}
