//! Split search over a layer's built histograms (`spec.md` §4.2).
//!
//! For every undecided node, sweeps each sampled column's histogram for the
//! best weighted SSE-reduction split, subject to `min_rows` and
//! `min_split_improvement`. Categorical columns are sorted by per-bin mean
//! response before the sweep (the standard "mean-target sort" reduction of
//! an otherwise exponential categorical split search to a linear scan).
//! Nodes with no admissible split become leaves (`spec.md` §4.2: "Nodes that
//! cannot split become Leaves with prediction 0").

use rayon::prelude::*;

use crate::gbm::frame::ChunkedFrame;
use crate::gbm::histogram::{DHistogram, Edges};
use crate::gbm::tree::{DTree, NaDirection, Node, SplitPredicate};

/// Parameters the split finder needs beyond what lives on each histogram.
/// Column subsampling (`col_sample_rate_per_tree`, `col_sample_rate`) is
/// already reflected in which histograms exist on each node by the time
/// `split_layer` runs — see `histogram_builder::build_layer`.
#[derive(Debug, Clone, Copy)]
pub struct SplitParams {
    pub min_rows: f64,
    pub min_split_improvement: f64,
}

/// A single column's evaluated best split, if any admissible one exists.
struct ColumnCandidate {
    column: usize,
    gain: f64,
    bin_cut: usize,
    /// Present only for categorical columns: the bin-index ordering the
    /// mean-response sort produced, so `bin_cut` can be translated back into
    /// the original levels each bin represents.
    category_order: Option<Vec<usize>>,
}

/// SSE-reduction gain of splitting total `(w, wy)` into left `(w, wy)` and
/// the complementary right side, the generic form that applies uniformly
/// regardless of distribution family since histograms already hold the
/// round's pseudo-residual as their "y" (spec.md §4.2: "or equivalent for
/// the distribution").
fn sse_gain(w_left: f64, wy_left: f64, w_total: f64, wy_total: f64) -> f64 {
    let w_right = w_total - w_left;
    let wy_right = wy_total - wy_left;
    if w_left <= 0.0 || w_right <= 0.0 {
        return f64::NEG_INFINITY;
    }
    (wy_left * wy_left) / w_left + (wy_right * wy_right) / w_right - (wy_total * wy_total) / w_total
}

/// Best prefix-sum split for a numeric histogram: cumulative left stats up
/// to and including bin `i` are compared against the total.
fn best_numeric_split(histo: &DHistogram, min_rows: f64) -> Option<(f64, usize)> {
    // Sums over `bins` only, not `histo.total_weight()` — the NA bin never
    // takes part in the threshold sweep (see `DHistogram::na_bin`).
    let w_total: f64 = histo.bins.iter().map(|b| b.w_sum).sum();
    let wy_total: f64 = histo.bins.iter().map(|b| b.wy_sum).sum();
    let count_total: u64 = histo.bins.iter().map(|b| b.count).sum();
    if count_total == 0 || histo.num_bins() < 2 {
        return None;
    }

    let mut w_left = 0.0;
    let mut wy_left = 0.0;
    let mut count_left = 0u64;
    let mut best: Option<(f64, usize)> = None;

    // The last bin has no right side to split against.
    for i in 0..histo.num_bins() - 1 {
        let bin = &histo.bins[i];
        w_left += bin.w_sum;
        wy_left += bin.wy_sum;
        count_left += bin.count;
        let count_right = count_total - count_left;
        if (count_left as f64) < min_rows || (count_right as f64) < min_rows {
            continue;
        }
        let gain = sse_gain(w_left, wy_left, w_total, wy_total);
        if best.map_or(true, |(best_gain, _)| gain > best_gain) {
            best = Some((gain, i));
        }
    }
    best
}

/// Evaluates a categorical histogram by sorting its bins by mean response,
/// then running the same prefix-sum sweep over the sorted order (the
/// "mean-target sort" reduction, spec.md §4.2).
fn best_categorical_split(histo: &DHistogram, min_rows: f64) -> Option<(f64, usize, Vec<usize>)> {
    let mut order: Vec<usize> = (0..histo.num_bins()).collect();
    order.sort_by(|&a, &b| {
        histo.bins[a]
            .mean()
            .partial_cmp(&histo.bins[b].mean())
            .unwrap()
    });

    // Sums over `bins` only, not `histo.total_weight()` — the NA bin never
    // takes part in the category-order sweep (see `DHistogram::na_bin`).
    let w_total: f64 = histo.bins.iter().map(|b| b.w_sum).sum();
    let wy_total: f64 = histo.bins.iter().map(|b| b.wy_sum).sum();
    let count_total: u64 = histo.bins.iter().map(|b| b.count).sum();
    if count_total == 0 || histo.num_bins() < 2 {
        return None;
    }

    let mut w_left = 0.0;
    let mut wy_left = 0.0;
    let mut count_left = 0u64;
    let mut best: Option<(f64, usize)> = None;

    for (i, &bin_idx) in order.iter().enumerate().take(order.len() - 1) {
        let bin = &histo.bins[bin_idx];
        w_left += bin.w_sum;
        wy_left += bin.wy_sum;
        count_left += bin.count;
        let count_right = count_total - count_left;
        if (count_left as f64) < min_rows || (count_right as f64) < min_rows {
            continue;
        }
        let gain = sse_gain(w_left, wy_left, w_total, wy_total);
        if best.map_or(true, |(best_gain, _)| gain > best_gain) {
            best = Some((gain, i));
        }
    }
    best.map(|(gain, cut)| (gain, cut, order))
}

fn evaluate_column(column: usize, histo: &DHistogram, min_rows: f64) -> Option<ColumnCandidate> {
    match &histo.edges {
        Edges::Numeric(_) => best_numeric_split(histo, min_rows).map(|(gain, bin_cut)| ColumnCandidate {
            column,
            gain,
            bin_cut,
            category_order: None,
        }),
        Edges::Categorical(_) => {
            best_categorical_split(histo, min_rows).map(|(gain, bin_cut, order)| ColumnCandidate {
                column,
                gain,
                bin_cut,
                category_order: Some(order),
            })
        }
    }
}

/// Turns a numeric candidate's bin cut into a threshold predicate: the
/// midpoint of the two edges straddling the cut, or the cut edge itself at
/// the boundary.
fn numeric_threshold(edges: &Edges, bin_cut: usize) -> f64 {
    match edges {
        Edges::Numeric(thresholds) => thresholds[bin_cut],
        Edges::Categorical(_) => unreachable!("numeric_threshold called on categorical edges"),
    }
}

/// Splits every still-undecided node in `layer` against its already-built
/// histograms, mutating the tree in place: admissible splits become
/// `Decided` nodes with two fresh `Undecided` children (empty histograms,
/// filled by the next layer's [`crate::gbm::histogram_builder::build_layer`]
/// call); inadmissible ones become leaves.
pub fn split_layer(tree: &mut DTree, _frame: &ChunkedFrame, layer: &[usize], _k: usize, params: SplitParams) {
    let best_per_node: Vec<(usize, Option<ColumnCandidate>)> = layer
        .par_iter()
        .map(|&nid| {
            let histograms = match tree.node(nid) {
                Node::Undecided { histograms } => histograms,
                _ => return (nid, None),
            };
            if histograms.is_empty() {
                return (nid, None);
            }

            let best = histograms
                .iter()
                .filter_map(|(column, histo)| evaluate_column(*column, histo, params.min_rows))
                .max_by(|a, b| {
                    a.gain
                        .partial_cmp(&b.gain)
                        .unwrap()
                        .then_with(|| b.column.cmp(&a.column))
                        .then_with(|| b.bin_cut.cmp(&a.bin_cut))
                });
            (nid, best)
        })
        .collect();

    for (nid, candidate) in best_per_node {
        let histograms = match tree.node(nid) {
            Node::Undecided { histograms } => histograms.clone(),
            _ => continue,
        };

        let accepted = candidate.filter(|c| c.gain.is_finite() && c.gain > params.min_split_improvement);

        match accepted {
            None => tree.make_leaf(nid),
            Some(candidate) => {
                let (_, histo) = histograms
                    .iter()
                    .find(|(c, _)| *c == candidate.column)
                    .expect("candidate column must come from this node's histograms");

                let (predicate, na_direction) = match &candidate.category_order {
                    None => {
                        let threshold = numeric_threshold(&histo.edges, candidate.bin_cut);
                        let left_weight: f64 = histo.bins[..=candidate.bin_cut].iter().map(|b| b.w_sum).sum();
                        let bins_total: f64 = histo.bins.iter().map(|b| b.w_sum).sum();
                        let right_weight = bins_total - left_weight;
                        let na_direction = if left_weight >= right_weight {
                            NaDirection::Left
                        } else {
                            NaDirection::Right
                        };
                        (
                            SplitPredicate::Threshold {
                                column: candidate.column,
                                threshold,
                            },
                            na_direction,
                        )
                    }
                    Some(order) => {
                        let num_levels = match &histo.edges {
                            Edges::Categorical(level_to_bin) => level_to_bin.len(),
                            _ => unreachable!(),
                        };
                        let left_bins: std::collections::HashSet<usize> =
                            order[..=candidate.bin_cut].iter().copied().collect();
                        let left_levels: Vec<bool> = match &histo.edges {
                            Edges::Categorical(level_to_bin) => (0..num_levels)
                                .map(|level| left_bins.contains(&level_to_bin[level]))
                                .collect(),
                            _ => unreachable!(),
                        };
                        let left_weight: f64 = left_bins.iter().map(|&b| histo.bins[b].w_sum).sum();
                        let bins_total: f64 = histo.bins.iter().map(|b| b.w_sum).sum();
                        let right_weight = bins_total - left_weight;
                        let na_direction = if left_weight >= right_weight {
                            NaDirection::Left
                        } else {
                            NaDirection::Right
                        };
                        (
                            SplitPredicate::Bitset {
                                column: candidate.column,
                                left_levels,
                            },
                            na_direction,
                        )
                    }
                };

                tree.decide(nid, predicate, na_direction, Vec::new(), Vec::new());
            }
        }
    }
}
