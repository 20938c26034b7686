//! Per-(node, feature) histogram accumulator (`DHistogram`, spec.md §3).

/// One bin's accumulated statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub w_sum: f64,
    pub wy_sum: f64,
    pub wyy_sum: f64,
    pub count: u64,
    pub min: f64,
    pub max: f64,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            w_sum: 0.0,
            wy_sum: 0.0,
            wyy_sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Bin {
    /// Folds one row's contribution into this bin.
    pub fn accumulate(&mut self, w: f64, y: f64) {
        self.w_sum += w;
        self.wy_sum += w * y;
        self.wyy_sum += w * y * y;
        self.count += 1;
        if y < self.min {
            self.min = y;
        }
        if y > self.max {
            self.max = y;
        }
    }

    /// Pairwise-merges another bin's statistics into this one (used by the
    /// deep-cloned concurrency mode's reduction, spec.md §4.3).
    pub fn merge(&mut self, other: &Bin) {
        self.w_sum += other.w_sum;
        self.wy_sum += other.wy_sum;
        self.wyy_sum += other.wyy_sum;
        self.count += other.count;
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
    }

    pub fn mean(&self) -> f64 {
        if self.w_sum == 0.0 {
            0.0
        } else {
            self.wy_sum / self.w_sum
        }
    }
}

/// Monotone bin edges for one feature, supplied by an external binning
/// service (`spec.md` §6).
#[derive(Debug, Clone)]
pub enum Edges {
    /// Numeric split thresholds, length = `bins - 1`.
    Numeric(Vec<f64>),
    /// Categorical level → bin index map, one bin per level up to a cap.
    Categorical(Vec<usize>),
}

impl Edges {
    /// Which bin a raw feature value falls into.
    pub fn bin_of(&self, value: f64) -> usize {
        match self {
            Edges::Numeric(thresholds) => {
                match thresholds.binary_search_by(|t| t.partial_cmp(&value).unwrap()) {
                    Ok(i) => i,
                    Err(i) => i,
                }
            }
            Edges::Categorical(level_to_bin) => {
                let level = value.round() as i64;
                if level < 0 || level as usize >= level_to_bin.len() {
                    0
                } else {
                    level_to_bin[level as usize]
                }
            }
        }
    }

    pub fn num_bins(&self) -> usize {
        match self {
            Edges::Numeric(thresholds) => thresholds.len() + 1,
            Edges::Categorical(level_to_bin) => {
                level_to_bin.iter().copied().max().map(|m| m + 1).unwrap_or(1)
            }
        }
    }
}

/// A zero-initialized per-(node, feature) accumulator over bins, built once
/// per layer and consumed by split selection. `na_bin` accumulates rows
/// whose feature value is NaN, keeping `total_weight()` equal to the node's
/// full active weight (spec.md §3) even on a feature with partial NAs. It
/// never takes part in the threshold/category sweep: the split search still
/// sums only `bins`, since a row's NA/non-NA membership is immaterial to
/// *which* ordered bin it would fall in, and the chosen split's NA-routing
/// side is decided afterward from the left/right weight majority
/// (`gbm::split`), not by sweeping `na_bin` as a candidate cut.
#[derive(Debug, Clone)]
pub struct DHistogram {
    pub edges: Edges,
    pub bins: Vec<Bin>,
    pub na_bin: Bin,
}

impl DHistogram {
    pub fn new(edges: Edges) -> Self {
        let n = edges.num_bins();
        Self {
            bins: vec![Bin::default(); n],
            edges,
            na_bin: Bin::default(),
        }
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn accumulate(&mut self, feature_value: f64, w: f64, y: f64) {
        if feature_value.is_nan() {
            self.na_bin.accumulate(w, y);
            return;
        }
        let bin = self.edges.bin_of(feature_value);
        self.bins[bin].accumulate(w, y);
    }

    /// Total active weight across all bins plus the NA bin (invariant
    /// check, spec.md §3/§8): equals the node's total active weight on this
    /// feature regardless of how many rows are NA on it.
    pub fn total_weight(&self) -> f64 {
        self.bins.iter().map(|b| b.w_sum).sum::<f64>() + self.na_bin.w_sum
    }

    pub fn merge(&mut self, other: &DHistogram) {
        for (a, b) in self.bins.iter_mut().zip(other.bins.iter()) {
            a.merge(b);
        }
        self.na_bin.merge(&other.na_bin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_accumulates_weighted_sums_and_extrema() {
        let mut bin = Bin::default();
        bin.accumulate(2.0, 3.0);
        bin.accumulate(1.0, -1.0);
        assert_eq!(bin.w_sum, 3.0);
        assert_eq!(bin.wy_sum, 5.0);
        assert_eq!(bin.count, 2);
        assert_eq!(bin.min, -1.0);
        assert_eq!(bin.max, 3.0);
    }

    #[test]
    fn numeric_edges_bucket_by_threshold() {
        let edges = Edges::Numeric(vec![0.0, 10.0]);
        assert_eq!(edges.bin_of(-5.0), 0);
        assert_eq!(edges.bin_of(5.0), 1);
        assert_eq!(edges.bin_of(15.0), 2);
        assert_eq!(edges.num_bins(), 3);
    }

    #[test]
    fn categorical_edges_map_levels_to_bins() {
        let edges = Edges::Categorical(vec![0, 1, 0]);
        assert_eq!(edges.bin_of(0.0), 0);
        assert_eq!(edges.bin_of(1.0), 1);
        assert_eq!(edges.bin_of(2.0), 0);
        assert_eq!(edges.num_bins(), 2);
    }

    #[test]
    fn histogram_total_weight_matches_sum_of_bin_weights() {
        let mut histo = DHistogram::new(Edges::Numeric(vec![0.0]));
        histo.accumulate(-1.0, 2.0, 1.0);
        histo.accumulate(1.0, 3.0, 2.0);
        assert_eq!(histo.total_weight(), 5.0);
    }

    #[test]
    fn nan_feature_values_accumulate_into_the_na_bin_not_an_ordered_bin() {
        let mut histo = DHistogram::new(Edges::Numeric(vec![0.0]));
        histo.accumulate(-1.0, 2.0, 1.0);
        histo.accumulate(f64::NAN, 3.0, 5.0);
        assert_eq!(histo.na_bin.w_sum, 3.0);
        assert_eq!(histo.na_bin.count, 1);
        assert_eq!(histo.bins.iter().map(|b| b.w_sum).sum::<f64>(), 2.0);
        assert_eq!(histo.total_weight(), 5.0);
    }

    #[test]
    fn merge_combines_two_histograms_bin_for_bin() {
        let mut a = DHistogram::new(Edges::Numeric(vec![0.0]));
        let mut b = DHistogram::new(Edges::Numeric(vec![0.0]));
        a.accumulate(-1.0, 1.0, 1.0);
        b.accumulate(-1.0, 2.0, 3.0);
        a.merge(&b);
        assert_eq!(a.bins[0].w_sum, 3.0);
        assert_eq!(a.bins[0].wy_sum, 7.0);
    }
}
