//! The parallel histogram-building engine (`spec.md` §4.3) — the data-parallel
//! heart of the training core.
//!
//! Two passes, both dispatched directly across Rayon's work-stealing pool
//! (`into_par_iter`/`par_chunks`/`join`, generalized here to the
//! row-chunk × column-block space `spec.md` §4.3 describes):
//!
//! - **Pass 1 (score & route):** for every row in the layer's OOB-aware
//!   active set, route it to its new undecided-leaf id via the tree's
//!   already-decided parent nodes, and group active rows by that id.
//! - **Pass 2 (aggregate):** for each (node, sampled column) pair, build a
//!   histogram over that node's assigned rows. Two concurrency modes
//!   (`spec.md` §4.3 "Shared histograms" / "Deep-cloned histograms") are
//!   both implemented: shared mode accumulates into lock-free atomic bins
//!   (`concurrency::atomics`) with a per-task local buffer batching updates
//!   before the atomic flush; cloned mode gives each row-sub-range task its
//!   own private histogram, pairwise-merged at task join via
//!   [`DHistogram::merge`] — the same reduction `rayon::join`'s own
//!   work-stealing tree performs, which is this crate's Rust-idiomatic
//!   reading of spec.md §4.3's "Tree-shaped task spawning" (see DESIGN.md).
//!
//! NA feature values accumulate into each histogram's dedicated `na_bin`
//! (`gbm::histogram::DHistogram`) rather than updating an ordered bin, so
//! `total_weight()` still equals the node's full active weight on a
//! partially-NA feature (`spec.md` §3). The threshold/category sweep in
//! `gbm::split` never considers `na_bin` itself as a candidate cut; the
//! chosen split's NA-routing side is decided afterward from the
//! non-NA left/right weight majority (`NaDirection::VsRest` is therefore
//! unused — see DESIGN.md's Open Question decision).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::concurrency::atomics::{AtomicDouble, AtomicMax, AtomicMin};
use crate::gbm::binning::Binning;
use crate::gbm::frame::{ChunkedFrame, DECIDED_ROW, FRESH, OOB};
use crate::gbm::histogram::{Bin, DHistogram, Edges};
use crate::gbm::tree::{DTree, Node};
use crate::termination::TerminationFlag;

/// Per-row outcome of Pass 1's score-and-route step.
enum RouteOutcome {
    /// Row is still active in this layer, now assigned to undecided node `usize`.
    Active(usize),
    /// Row is OOB, zero-weight, NA-response, or already terminated at a leaf —
    /// it takes no further part in this round's histogram building.
    Sentinel,
}

/// Routes one row through the tree's already-decided ancestors to its
/// current undecided-leaf id, per `spec.md` §4.3 Pass 1.
fn score_decide(frame: &ChunkedFrame, tree: &DTree, k: usize, row: usize, chunk_idx: usize, row_in_chunk: usize) -> RouteOutcome {
    let weight = frame.weight(chunk_idx, row_in_chunk);
    let y = frame.response_chunk(chunk_idx)[row_in_chunk];
    let current = frame.nids(k).get(row);

    if current == OOB || current == DECIDED_ROW {
        return RouteOutcome::Sentinel;
    }
    if weight <= 0.0 || y.is_nan() {
        return RouteOutcome::Sentinel;
    }

    let start = if current == FRESH {
        tree.root()
    } else {
        current as usize
    };

    match tree.node(start) {
        Node::Leaf { .. } => RouteOutcome::Sentinel,
        Node::Undecided { .. } => RouteOutcome::Active(start),
        Node::Decided { .. } => {
            let new_nid = tree.route(start, |c| {
                let v = frame.feature_value(c, row);
                if v.is_nan() {
                    None
                } else {
                    Some(v)
                }
            });
            RouteOutcome::Active(new_nid)
        }
    }
}

/// Pass 1 output: for every node in the layer, the global row indices
/// assigned to it this pass — the counting-sort grouping of `spec.md` §4.3
/// ("This groups all rows destined for the same node contiguously"),
/// expressed as a hash map rather than a literal sorted permutation array
/// since `DHistogram`'s accumulation order is commutative.
fn route_layer(frame: &mut ChunkedFrame, tree: &DTree, k: usize, layer: &[usize]) -> HashMap<usize, Vec<usize>> {
    let layer_set: std::collections::HashSet<usize> = layer.iter().copied().collect();

    let per_chunk_updates: Vec<Vec<(usize, i64)>> = (0..frame.num_chunks())
        .into_par_iter()
        .map(|chunk_idx| {
            let mut updates = Vec::new();
            for row_in_chunk in 0..frame.chunk_len(chunk_idx) {
                let row = frame.global_row(chunk_idx, row_in_chunk);
                match score_decide(frame, tree, k, row, chunk_idx, row_in_chunk) {
                    RouteOutcome::Active(nid) => updates.push((row, nid as i64)),
                    RouteOutcome::Sentinel => updates.push((row, DECIDED_ROW)),
                }
            }
            updates
        })
        .collect();

    let nids = frame.nids_mut(k);
    let mut grouped: HashMap<usize, Vec<usize>> = layer.iter().map(|&n| (n, Vec::new())).collect();
    for chunk in per_chunk_updates {
        for (row, nid) in chunk {
            nids.set(row, nid);
            if nid >= 0 && layer_set.contains(&(nid as usize)) {
                grouped.get_mut(&(nid as usize)).unwrap().push(row);
            }
        }
    }
    grouped
}

/// A single bin's statistics behind lock-free atomics — the "shared
/// histograms" concurrency mode of `spec.md` §4.3.
struct AtomicBin {
    w_sum: AtomicDouble,
    wy_sum: AtomicDouble,
    wyy_sum: AtomicDouble,
    count: AtomicU64,
    min: AtomicMin,
    max: AtomicMax,
}

impl AtomicBin {
    fn new() -> Self {
        Self {
            w_sum: AtomicDouble::zero(),
            wy_sum: AtomicDouble::zero(),
            wyy_sum: AtomicDouble::zero(),
            count: AtomicU64::new(0),
            min: AtomicMin::new(f64::INFINITY),
            max: AtomicMax::new(f64::NEG_INFINITY),
        }
    }

    fn flush(&self, w: f64, wy: f64, wyy: f64, count: u64, min: f64, max: f64) {
        if count == 0 {
            return;
        }
        self.w_sum.add(w, Ordering::Relaxed);
        self.wy_sum.add(wy, Ordering::Relaxed);
        self.wyy_sum.add(wyy, Ordering::Relaxed);
        self.count.fetch_add(count, Ordering::Relaxed);
        self.min.update(min, Ordering::Relaxed);
        self.max.update(max, Ordering::Relaxed);
    }

    fn into_bin(self) -> Bin {
        Bin {
            w_sum: self.w_sum.load(Ordering::Relaxed),
            wy_sum: self.wy_sum.load(Ordering::Relaxed),
            wyy_sum: self.wyy_sum.load(Ordering::Relaxed),
            count: self.count.load(Ordering::Relaxed),
            min: self.min.load(Ordering::Relaxed),
            max: self.max.load(Ordering::Relaxed),
        }
    }

    fn flush_bin(&self, local: &Bin) {
        self.flush(local.w_sum, local.wy_sum, local.wyy_sum, local.count, local.min, local.max);
    }
}

/// Builds one (node, column) histogram in shared-atomic mode: workers split
/// `rows` into chunk-sized sub-ranges, accumulate each sub-range into a
/// small local buffer (`updateSharedHistosAndReset` in spec.md §4.3), then
/// flush the buffer into the atomic bins once per sub-range rather than
/// once per row.
fn build_shared(frame: &ChunkedFrame, k: usize, column: usize, edges: &Edges, rows: &[usize]) -> DHistogram {
    let num_bins = edges.num_bins();
    let atomic_bins: Vec<AtomicBin> = (0..num_bins).map(|_| AtomicBin::new()).collect();
    let atomic_na_bin = AtomicBin::new();

    let batch = (rows.len() / rayon::current_num_threads().max(1)).max(1);
    rows.par_chunks(batch).for_each(|sub_range| {
        let mut local: Vec<Bin> = vec![Bin::default(); num_bins];
        let mut local_na = Bin::default();
        for &row in sub_range {
            let x = frame.feature_value(column, row);
            let y = frame.work(k).get(row);
            let w = frame.weight_for_row(row);
            if x.is_nan() {
                local_na.accumulate(w, y);
                continue;
            }
            let bin = edges.bin_of(x);
            local[bin].accumulate(w, y);
        }
        for (bin_idx, local_bin) in local.into_iter().enumerate() {
            atomic_bins[bin_idx].flush_bin(&local_bin);
        }
        atomic_na_bin.flush_bin(&local_na);
    });

    let bins: Vec<Bin> = atomic_bins.into_iter().map(AtomicBin::into_bin).collect();
    DHistogram {
        edges: edges.clone(),
        bins,
        na_bin: atomic_na_bin.into_bin(),
    }
}

/// Builds one (node, column) histogram in deep-cloned mode: each task owns a
/// private histogram over a contiguous sub-range of `rows`, pairwise-merged
/// via [`DHistogram::merge`] through Rayon's own work-stealing join tree —
/// the idiomatic Rust reading of spec.md §4.3's binary fan-out with
/// pairwise reduction at task join.
fn build_cloned(frame: &ChunkedFrame, k: usize, column: usize, edges: &Edges, rows: &[usize]) -> DHistogram {
    if rows.is_empty() {
        return DHistogram::new(edges.clone());
    }
    const SEQUENTIAL_THRESHOLD: usize = 2048;
    fn recurse(frame: &ChunkedFrame, k: usize, column: usize, edges: &Edges, rows: &[usize]) -> DHistogram {
        if rows.len() <= SEQUENTIAL_THRESHOLD {
            let mut histo = DHistogram::new(edges.clone());
            for &row in rows {
                let x = frame.feature_value(column, row);
                let y = frame.work(k).get(row);
                let w = frame.weight_for_row(row);
                histo.accumulate(x, w, y);
            }
            return histo;
        }
        let mid = rows.len() / 2;
        let (left, right) = rows.split_at(mid);
        let (mut a, b) = rayon::join(
            || recurse(frame, k, column, edges, left),
            || recurse(frame, k, column, edges, right),
        );
        a.merge(&b);
        a
    }
    recurse(frame, k, column, edges, rows)
}

/// Builds all histograms for one layer of undecided nodes for class `k`,
/// mutating each `Node::Undecided`'s `histograms` field in place
/// (`spec.md` §4.3's Output: "filled histograms on each active undecided
/// node"). `tree_columns` is the tree-level column subset chosen once per
/// tree (`col_sample_rate_per_tree`); `col_sample_rate` then subsamples
/// fresh from that set for this layer only (`gbm::sampler::sample_split_columns`,
/// see DESIGN.md's Open Question resolution) before any histogram work
/// happens, so a column dropped by the layer-level sample never gets a
/// histogram built for it.
#[allow(clippy::too_many_arguments)]
pub fn build_layer(
    frame: &mut ChunkedFrame,
    tree: &mut DTree,
    layer: &[usize],
    k: usize,
    tree_columns: &[usize],
    col_sample_rate: f64,
    round: usize,
    seed: u64,
    binning: &dyn Binning,
    nbins: usize,
    shared_histo: bool,
    termination: &TerminationFlag,
) -> crate::errors::GbmResult<()> {
    if layer.is_empty() {
        return Ok(());
    }
    if !termination.running() {
        return Err(crate::errors::GbmError::Terminated(
            crate::termination::TerminatedException,
        ));
    }

    let grouped = route_layer(frame, tree, k, layer);

    if !termination.running() {
        return Err(crate::errors::GbmError::Terminated(
            crate::termination::TerminatedException,
        ));
    }

    let layer_columns: Vec<usize> = if col_sample_rate >= 1.0 {
        tree_columns.to_vec()
    } else {
        let sampled = crate::gbm::sampler::sample_split_columns(
            frame.num_features(),
            col_sample_rate,
            round,
            k,
            seed,
        );
        tree_columns.iter().copied().filter(|c| sampled.contains(c)).collect()
    };

    // Pass 2: parallel over (node, column) pairs — the column-block ×
    // row-chunk fan-out of spec.md §4.3, collapsed here to one flat
    // parallel iterator since rows are already grouped per node.
    let tasks: Vec<(usize, usize)> = layer
        .iter()
        .flat_map(|&nid| layer_columns.iter().map(move |&c| (nid, c)))
        .collect();

    let results: Vec<(usize, usize, DHistogram)> = tasks
        .into_par_iter()
        .map(|(nid, column)| {
            let rows = &grouped[&nid];
            let edges = binning.edges_for(column, nbins);
            let histo = if shared_histo {
                build_shared(frame, k, column, &edges, rows)
            } else {
                build_cloned(frame, k, column, &edges, rows)
            };
            (nid, column, histo)
        })
        .collect();

    let mut by_node: HashMap<usize, Vec<(usize, DHistogram)>> =
        layer.iter().map(|&n| (n, Vec::new())).collect();
    for (nid, column, histo) in results {
        by_node.get_mut(&nid).unwrap().push((column, histo));
    }

    for (nid, histograms) in by_node {
        if let Node::Undecided { histograms: slot } = tree.node_mut(nid) {
            *slot = histograms;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbm::binning::EqualWidthBinning;
    use crate::gbm::frame::Column;
    use crate::gbm::tree::DTree;

    fn toy_frame() -> ChunkedFrame {
        let x1 = Column::numeric(vec![vec![-2.0, -1.0, 1.0, 2.0]]);
        let y = Column::numeric(vec![vec![0.0, 0.0, 0.0, 0.0]]);
        let mut frame = ChunkedFrame::new(vec![x1], y, None, 1).unwrap();
        frame.work_mut(0).set(0, -1.0);
        frame.work_mut(0).set(1, -1.0);
        frame.work_mut(0).set(2, 1.0);
        frame.work_mut(0).set(3, 1.0);
        frame
    }

    #[test]
    fn build_layer_fills_root_histogram_with_total_weight() {
        let mut frame = toy_frame();
        let mut tree = DTree::with_root(vec![]);
        let binning = EqualWidthBinning::new(vec![Some((-2.0, 2.0))], vec![0]);
        let termination = TerminationFlag::running_true();

        build_layer(&mut frame, &mut tree, &[0], 0, &[0], 1.0, 1, 0, &binning, 4, false, &termination).unwrap();

        match tree.node(0) {
            Node::Undecided { histograms } => {
                assert_eq!(histograms.len(), 1);
                let (col, histo) = &histograms[0];
                assert_eq!(*col, 0);
                assert_eq!(histo.total_weight(), 4.0);
            }
            _ => panic!("expected undecided root"),
        }
    }

    #[test]
    fn shared_and_cloned_modes_agree() {
        let frame = toy_frame();
        let edges = Edges::Numeric(vec![0.0]);
        let rows: Vec<usize> = (0..4).collect();
        let shared = build_shared(&frame, 0, 0, &edges, &rows);
        let cloned = build_cloned(&frame, 0, 0, &edges, &rows);
        for (a, b) in shared.bins.iter().zip(cloned.bins.iter()) {
            assert!((a.w_sum - b.w_sum).abs() < 1e-10);
            assert!((a.wy_sum - b.wy_sum).abs() < 1e-10);
            assert_eq!(a.count, b.count);
        }
    }

    #[test]
    fn col_sample_rate_below_one_skips_histogram_work_for_dropped_columns() {
        let x1 = Column::numeric(vec![vec![-2.0, -1.0, 1.0, 2.0]]);
        let x2 = Column::numeric(vec![vec![-2.0, -1.0, 1.0, 2.0]]);
        let x3 = Column::numeric(vec![vec![-2.0, -1.0, 1.0, 2.0]]);
        let x4 = Column::numeric(vec![vec![-2.0, -1.0, 1.0, 2.0]]);
        let y = Column::numeric(vec![vec![0.0, 0.0, 0.0, 0.0]]);
        let mut frame = ChunkedFrame::new(vec![x1, x2, x3, x4], y, None, 1).unwrap();
        frame.work_mut(0).set(0, -1.0);
        frame.work_mut(0).set(1, -1.0);
        frame.work_mut(0).set(2, 1.0);
        frame.work_mut(0).set(3, 1.0);
        let mut tree = DTree::with_root(vec![]);
        let binning = EqualWidthBinning::new(vec![Some((-2.0, 2.0)); 4], vec![0, 0, 0, 0]);
        let termination = TerminationFlag::running_true();
        let tree_columns = [0, 1, 2, 3];

        build_layer(
            &mut frame,
            &mut tree,
            &[0],
            0,
            &tree_columns,
            0.5,
            1,
            0,
            &binning,
            4,
            false,
            &termination,
        )
        .unwrap();

        let expected = crate::gbm::sampler::sample_split_columns(4, 0.5, 1, 0, 0);
        match tree.node(0) {
            Node::Undecided { histograms } => {
                assert!(histograms.len() < tree_columns.len());
                let built: std::collections::HashSet<usize> =
                    histograms.iter().map(|(c, _)| *c).collect();
                assert_eq!(built, expected.into_iter().collect());
            }
            _ => panic!("expected undecided root"),
        }
    }

    #[test]
    fn oob_rows_never_enter_a_histogram() {
        let mut frame = toy_frame();
        frame.nids_mut(0).set(0, OOB);
        let mut tree = DTree::with_root(vec![]);
        let binning = EqualWidthBinning::new(vec![Some((-2.0, 2.0))], vec![0]);
        let termination = TerminationFlag::running_true();
        build_layer(&mut frame, &mut tree, &[0], 0, &[0], 1.0, 1, 0, &binning, 4, false, &termination).unwrap();
        match tree.node(0) {
            Node::Undecided { histograms } => {
                assert_eq!(histograms[0].1.total_weight(), 3.0);
            }
            _ => panic!("expected undecided root"),
        }
    }

    /// spec.md §3's histogram weight-sum invariant ("sum of bin weights for
    /// any (node, feature) histogram equals the total active weight in that
    /// node") must hold even when some rows are NA on the feature being
    /// histogrammed — those rows still land in `na_bin`.
    #[test]
    fn total_weight_matches_node_weight_with_a_partially_na_feature_column() {
        let x1 = Column::numeric(vec![vec![-2.0, f64::NAN, 1.0, f64::NAN]]);
        let y = Column::numeric(vec![vec![0.0, 0.0, 0.0, 0.0]]);
        let mut frame = ChunkedFrame::new(vec![x1], y, None, 1).unwrap();
        frame.work_mut(0).set(0, -1.0);
        frame.work_mut(0).set(1, 2.0);
        frame.work_mut(0).set(2, 1.0);
        frame.work_mut(0).set(3, -3.0);
        let binning = EqualWidthBinning::new(vec![Some((-2.0, 2.0))], vec![0]);
        let edges = binning.edges_for(0, 4);
        let rows: Vec<usize> = (0..4).collect();

        let shared = build_shared(&frame, 0, 0, &edges, &rows);
        let cloned = build_cloned(&frame, 0, 0, &edges, &rows);
        assert_eq!(shared.total_weight(), 4.0);
        assert_eq!(cloned.total_weight(), 4.0);
        assert_eq!(shared.na_bin.count, 2);
        assert_eq!(cloned.na_bin.count, 2);

        let mut tree = DTree::with_root(vec![]);
        let termination = TerminationFlag::running_true();
        build_layer(&mut frame, &mut tree, &[0], 0, &[0], 1.0, 1, 0, &binning, 4, false, &termination).unwrap();
        match tree.node(0) {
            Node::Undecided { histograms } => {
                assert_eq!(histograms[0].1.total_weight(), 4.0);
            }
            _ => panic!("expected undecided root"),
        }
    }
}
