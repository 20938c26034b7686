//! The binning service external interface (spec.md §6): given a feature and
//! a desired bin count, produce monotone bin edges. Quantile-binning
//! preprocessing itself is out of scope (spec.md §1 Non-goals); this module
//! only defines the trait callers implement, plus a simple equal-width
//! default used by tests and small examples.

use crate::gbm::histogram::Edges;

/// Produces per-feature bin edges for histogram construction.
pub trait Binning: Send + Sync {
    /// Numeric or categorical bin edges for feature `column`, using up to
    /// `nbins` bins (numeric) or `nbins_cats` levels (categorical).
    fn edges_for(&self, column: usize, nbins: usize) -> Edges;
}

/// Equal-width numeric binning computed from a full column scan, with
/// categorical columns mapped one level per bin (capped at `nbins`).
///
/// This is the simplest binning strategy and is not meant to replace a real
/// quantile-binning service in production use — it exists so the training
/// core is independently testable without one.
pub struct EqualWidthBinning {
    /// Per-feature `(min, max)`, or `None` for categorical columns.
    ranges: Vec<Option<(f64, f64)>>,
    /// Per-feature level count, for categorical columns.
    level_counts: Vec<usize>,
}

impl EqualWidthBinning {
    pub fn new(ranges: Vec<Option<(f64, f64)>>, level_counts: Vec<usize>) -> Self {
        Self {
            ranges,
            level_counts,
        }
    }

    /// Computes ranges for numeric columns (`None` for the others) by
    /// scanning every chunk once.
    pub fn from_frame(frame: &crate::gbm::frame::ChunkedFrame) -> Self {
        use crate::gbm::frame::ColumnKind;
        let mut ranges = Vec::with_capacity(frame.num_features());
        let mut level_counts = Vec::with_capacity(frame.num_features());
        for c in 0..frame.num_features() {
            match frame.column_kind(c) {
                ColumnKind::Categorical => {
                    ranges.push(None);
                    level_counts.push(frame.domain(c).len().max(1));
                }
                _ => {
                    let mut lo = f64::INFINITY;
                    let mut hi = f64::NEG_INFINITY;
                    for chunk in 0..frame.num_chunks() {
                        for &v in frame.get_chunk(c, chunk) {
                            if v.is_finite() {
                                if v < lo {
                                    lo = v;
                                }
                                if v > hi {
                                    hi = v;
                                }
                            }
                        }
                    }
                    if !lo.is_finite() || !hi.is_finite() {
                        lo = 0.0;
                        hi = 1.0;
                    }
                    ranges.push(Some((lo, hi)));
                    level_counts.push(0);
                }
            }
        }
        Self::new(ranges, level_counts)
    }
}

impl Binning for EqualWidthBinning {
    fn edges_for(&self, column: usize, nbins: usize) -> Edges {
        let nbins = nbins.max(1);
        match self.ranges[column] {
            Some((lo, hi)) => {
                if (hi - lo).abs() < f64::EPSILON || nbins == 1 {
                    return Edges::Numeric(vec![]);
                }
                let step = (hi - lo) / nbins as f64;
                let thresholds = (1..nbins).map(|i| lo + step * i as f64).collect();
                Edges::Numeric(thresholds)
            }
            None => {
                let levels = self.level_counts[column].min(nbins).max(1);
                Edges::Categorical((0..levels).collect())
            }
        }
    }
}
