//! Residual/gradient pass (`spec.md` §4.4, invoked as boosting driver step 1).
//!
//! Writes the current round's negative-half-gradient into `WORK[k]` for
//! every active row. Grounded on `gbm::distribution`'s capability set for
//! the per-family gradient, with two special-cased paths the distribution
//! interface alone can't express: multinomial's joint softmax over all
//! classes, and Huber's delta-dependent clipping (the two-step gamma fit in
//! `gbm::gamma` needs the same `huber_delta`, so it is returned here rather
//! than recomputed).

use crate::gbm::distribution::{Distribution, Family};
use crate::gbm::frame::ChunkedFrame;
use crate::gbm::quantile;
use rayon::prelude::*;

/// Per-round residual-pass output needed by later stages of the same round.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResidualSummary {
    /// `huberDelta`, the weighted `huber_alpha`-quantile of `|y - f|` across
    /// all active rows. Only populated for `Family::Huber`; the two-step
    /// gamma fit (`spec.md` §4.5) reuses this exact value.
    pub huber_delta: Option<f64>,
}

/// Computes `WORK[k]` for every class from the current `TREE[k]` (plus
/// `init_f[k]`), per `spec.md` §4.4. Rows with weight 0 or NA response are
/// skipped (left at the 0.0 that `ChunkedFrame::clear_work` establishes).
///
/// `num_classes` is the distribution-collapsed class count
/// (`distribution.num_classes(frame.num_classes())`, as computed by
/// `gbm::driver::train` and used to size `init_f`) — not
/// `frame.num_classes()` itself, which stays fixed at the frame's raw
/// scratch-array count and would wrongly take the joint-softmax path for
/// `nclass=2` multinomial's single-tree optimization (`spec.md` §8).
pub fn compute_residuals(
    frame: &mut ChunkedFrame,
    distribution: Distribution,
    init_f: &[f64],
    num_classes: usize,
) -> ResidualSummary {
    frame.clear_work();
    match distribution.family {
        Family::Huber => {
            let delta = huber_residuals(frame, init_f[0], distribution.params.huber_alpha);
            ResidualSummary {
                huber_delta: Some(delta),
            }
        }
        Family::Multinomial if num_classes > 1 => {
            multinomial_residuals(frame, init_f, num_classes);
            ResidualSummary::default()
        }
        _ => {
            single_class_residuals(frame, distribution, init_f[0]);
            ResidualSummary::default()
        }
    }
}

/// Every row's `f = TREE[0][row] + init_f`, gated on weight/NA, computed in
/// parallel per chunk and applied back serially (chunk outputs are disjoint
/// row ranges, so there is no write contention to synchronize).
fn active_rows_per_chunk<T, F>(frame: &ChunkedFrame, compute: F) -> Vec<Vec<(usize, T)>>
where
    T: Send,
    F: Fn(usize, f64, f64, f64) -> Option<T> + Sync, // (row, weight, y, f) -> Option<value>
{
    (0..frame.num_chunks())
        .into_par_iter()
        .map(|chunk_idx| {
            let mut out = Vec::new();
            for row_in_chunk in 0..frame.chunk_len(chunk_idx) {
                let row = frame.global_row(chunk_idx, row_in_chunk);
                let w = frame.weight(chunk_idx, row_in_chunk);
                let y = frame.response_chunk(chunk_idx)[row_in_chunk];
                if w <= 0.0 || y.is_nan() {
                    continue;
                }
                let f = frame.tree(0).get(row);
                if let Some(value) = compute(row, w, y, f) {
                    out.push((row, value));
                }
            }
            out
        })
        .collect()
}

fn single_class_residuals(frame: &mut ChunkedFrame, distribution: Distribution, offset: f64) {
    let per_chunk = active_rows_per_chunk(frame, |_row, _w, y, f| {
        Some(distribution.neg_half_gradient(y, f + offset))
    });
    let work = frame.work_mut(0);
    for chunk in per_chunk {
        for (row, grad) in chunk {
            work.set(row, grad);
        }
    }
}

/// Huber's two-stage residual: derive `huberDelta` from the weighted
/// `huber_alpha`-quantile of `|y - f|` over all active rows (one stratum),
/// then clip the raw residual to `[-delta, delta]` (`spec.md` §4.1 step 1).
fn huber_residuals(frame: &mut ChunkedFrame, offset: f64, huber_alpha: f64) -> f64 {
    let per_chunk = active_rows_per_chunk(frame, move |_row, w, y, f| Some(((y - (f + offset)).abs(), w)));
    let mut abs_residuals = Vec::new();
    let mut weights = Vec::new();
    for chunk in &per_chunk {
        for &(_row, (abs_r, w)) in chunk {
            abs_residuals.push(abs_r);
            weights.push(w);
        }
    }
    let strata = vec![0usize; abs_residuals.len()];
    let quantiles = quantile::stratified_quantile(&abs_residuals, &weights, &strata, huber_alpha);
    let delta = quantiles.get(&0).copied().unwrap_or(0.0);

    let per_chunk = active_rows_per_chunk(frame, move |_row, _w, y, f| {
        let r = y - (f + offset);
        let clipped = if r.abs() <= delta {
            r
        } else {
            delta * r.signum()
        };
        Some(clipped)
    });
    let work = frame.work_mut(0);
    for chunk in per_chunk {
        for (row, grad) in chunk {
            work.set(row, grad);
        }
    }
    delta
}

/// Joint softmax residual for multinomial: `WORK[k][row] = 1{y=k} - p_k`.
/// If any logit overflows to `+inf`, the saturating vector assigns
/// probability 1 to the first class whose logit is `+inf` and 0 elsewhere,
/// rather than propagating NaN through `0/0` in the softmax.
fn multinomial_residuals(frame: &mut ChunkedFrame, init_f: &[f64], num_classes: usize) {
    let per_chunk: Vec<Vec<(usize, Vec<f64>)>> = (0..frame.num_chunks())
        .into_par_iter()
        .map(|chunk_idx| {
            let mut out = Vec::new();
            for row_in_chunk in 0..frame.chunk_len(chunk_idx) {
                let row = frame.global_row(chunk_idx, row_in_chunk);
                let w = frame.weight(chunk_idx, row_in_chunk);
                let y = frame.response_chunk(chunk_idx)[row_in_chunk];
                if w <= 0.0 || y.is_nan() {
                    continue;
                }
                let y_class = y.round() as i64;
                let logits: Vec<f64> = (0..num_classes)
                    .map(|k| frame.tree(k).get(row) + init_f[k])
                    .collect();

                let probs = softmax(&logits);
                let residuals: Vec<f64> = (0..num_classes)
                    .map(|k| {
                        let indicator = if y_class == k as i64 { 1.0 } else { 0.0 };
                        indicator - probs[k]
                    })
                    .collect();
                out.push((row, residuals));
            }
            out
        })
        .collect();

    for k in 0..num_classes {
        let work = frame.work_mut(k);
        for chunk in &per_chunk {
            for (row, residuals) in chunk {
                work.set(*row, residuals[k]);
            }
        }
    }
}

/// Numerically-stable softmax with an explicit overflow path: if any logit
/// is `+inf`, the saturating vector puts all mass on the first such class
/// (`spec.md` §4.4).
fn softmax(logits: &[f64]) -> Vec<f64> {
    if let Some(saturated) = logits.iter().position(|&x| x == f64::INFINITY) {
        return (0..logits.len())
            .map(|k| if k == saturated { 1.0 } else { 0.0 })
            .collect();
    }
    let max_logit = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum <= 0.0 {
        return vec![1.0 / logits.len() as f64; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbm::frame::Column;

    fn toy_frame(y: Vec<f64>) -> ChunkedFrame {
        let n = y.len();
        let x1 = Column::numeric(vec![vec![0.0; n]]);
        let resp = Column::numeric(vec![y]);
        ChunkedFrame::new(vec![x1], resp, None, 1).unwrap()
    }

    #[test]
    fn gaussian_residual_is_y_minus_f() {
        let mut frame = toy_frame(vec![3.0, 5.0]);
        let distribution = Distribution::gaussian();
        compute_residuals(&mut frame, distribution, &[1.0], 1);
        assert_eq!(frame.work(0).get(0), 2.0);
        assert_eq!(frame.work(0).get(1), 4.0);
    }

    #[test]
    fn zero_weight_rows_are_skipped() {
        let n = 2;
        let x1 = Column::numeric(vec![vec![0.0; n]]);
        let resp = Column::numeric(vec![vec![3.0, 3.0]]);
        let weights = Column::numeric(vec![vec![1.0, 0.0]]);
        let mut frame = ChunkedFrame::new(vec![x1], resp, Some(weights), 1).unwrap();
        compute_residuals(&mut frame, Distribution::gaussian(), &[0.0], 1);
        assert_eq!(frame.work(0).get(0), 3.0);
        assert_eq!(frame.work(0).get(1), 0.0);
    }

    #[test]
    fn na_response_rows_are_skipped() {
        let mut frame = toy_frame(vec![3.0, f64::NAN]);
        compute_residuals(&mut frame, Distribution::gaussian(), &[0.0], 1);
        assert_eq!(frame.work(0).get(0), 3.0);
        assert_eq!(frame.work(0).get(1), 0.0);
    }

    #[test]
    fn softmax_saturates_on_positive_infinite_logit() {
        let probs = softmax(&[0.0, f64::INFINITY, 1.0]);
        assert_eq!(probs, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn huber_delta_is_the_weighted_quantile_of_absolute_residuals() {
        let mut frame = toy_frame(vec![0.0, 10.0, 20.0, 30.0]);
        let distribution = Distribution::new(
            Family::Huber,
            crate::gbm::distribution::DistributionParams::default(),
        );
        let summary = compute_residuals(&mut frame, distribution, &[0.0], 1);
        assert!(summary.huber_delta.unwrap() > 0.0);
    }

    #[test]
    fn nclass_two_multinomial_uses_the_single_tree_collapsed_path() {
        // spec.md §8: nclass=2 multinomial collapses to the single-tree
        // optimization, so `compute_residuals` must take the collapsed
        // `num_classes=1` here, not `frame.num_classes()` (which stays 2 —
        // the frame itself still has two raw scratch arrays available).
        let x1 = Column::numeric(vec![vec![0.0, 0.0]]);
        let resp = Column::numeric(vec![vec![0.0, 1.0]]);
        let mut frame = ChunkedFrame::new(vec![x1], resp, None, 2).unwrap();
        let distribution = Distribution::new(
            Family::Multinomial,
            crate::gbm::distribution::DistributionParams::default(),
        );
        compute_residuals(&mut frame, distribution, &[0.0], 1);
        assert_eq!(frame.work(0).get(0), 0.0 - distribution.link_inv(0.0));
        assert_eq!(frame.work(0).get(1), 1.0 - distribution.link_inv(0.0));
    }
}
