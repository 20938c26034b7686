//! The column-partitioned, chunked dataset the training core operates over.
//!
//! Per `spec.md` §3 and the redesign note in `SPEC_FULL.md` §3, `ChunkedFrame`
//! owns the feature/response columns plus the per-class scratch columns
//! (`TREE`/`WORK`/`NIDS`) as an inherent struct rather than a trait reached
//! through a collaborator — but it still implements the external Frame
//! service interface from `spec.md` §6 (`get_chunk`/`num_chunks`/`chunk_len`/
//! `column_kind`/`domain`) as inherent methods.

use crate::collections::{HugeDoubleArray, HugeLongArray};
use crate::errors::{GbmError, GbmResult};

/// NID sentinel: row about to be placed at the tree root next round.
pub const FRESH: i64 = -1;
/// NID sentinel: row excluded from this tree by row sampling.
pub const OOB: i64 = -2;
/// NID sentinel: row reached a child not yet expanded this layer.
pub const UNDECIDED_CHILD: i64 = -3;
/// NID sentinel: row already terminated at a leaf in a prior layer.
pub const DECIDED_ROW: i64 = -4;

/// The storage kind of a Frame column, per `spec.md` §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Time,
    String,
    Uuid,
}

/// A single dense column, partitioned into fixed-size chunks.
///
/// Values are stored as `f64` uniformly; categorical columns hold integer
/// level codes cast to `f64` (consistent with the Frame service returning
/// "dense doubles" for every column kind per `spec.md` §6).
#[derive(Debug, Clone)]
pub struct Column {
    kind: ColumnKind,
    chunks: Vec<Vec<f64>>,
    /// Ordered categorical levels, only populated for `Categorical` columns.
    domain: Vec<String>,
}

impl Column {
    pub fn numeric(chunks: Vec<Vec<f64>>) -> Self {
        Self {
            kind: ColumnKind::Numeric,
            chunks,
            domain: Vec::new(),
        }
    }

    pub fn categorical(chunks: Vec<Vec<f64>>, domain: Vec<String>) -> Self {
        Self {
            kind: ColumnKind::Categorical,
            chunks,
            domain,
        }
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn chunk(&self, chunk_idx: usize) -> &[f64] {
        &self.chunks[chunk_idx]
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }
}

/// The dataset image the training core visits each round: feature columns,
/// the response, optional row weights, and the per-class scratch columns.
pub struct ChunkedFrame {
    feature_columns: Vec<Column>,
    response: Column,
    weights: Option<Column>,
    chunk_size: usize,
    num_rows: usize,
    chunk_lengths: Vec<usize>,
    /// Prefix sums of `chunk_lengths`, so a global row index can be mapped
    /// back to `(chunk_idx, row_in_chunk)` by binary search.
    chunk_offsets: Vec<usize>,

    /// `TREE[k]`: running sum of previously-built trees, in link space.
    tree: Vec<HugeDoubleArray>,
    /// `WORK[k]`: negative half-gradient for the current round.
    work: Vec<HugeDoubleArray>,
    /// `NIDS[k]`: current node id each row is assigned to in the tree being grown.
    nids: Vec<HugeLongArray>,
}

impl ChunkedFrame {
    /// Builds a frame from column-major chunked data. All columns (feature,
    /// response, and weights if present) must share identical chunk
    /// boundaries.
    pub fn new(
        feature_columns: Vec<Column>,
        response: Column,
        weights: Option<Column>,
        num_classes: usize,
    ) -> GbmResult<Self> {
        let num_chunks = response.num_chunks();
        let chunk_lengths: Vec<usize> = response.chunks.iter().map(|c| c.len()).collect();
        let same_boundaries = |col: &Column| {
            col.num_chunks() == num_chunks
                && col.chunks.iter().map(|c| c.len()).eq(chunk_lengths.iter().copied())
        };
        for col in feature_columns.iter() {
            if !same_boundaries(col) {
                return Err(GbmError::Frame(
                    "all columns must share the same chunk boundaries".to_string(),
                ));
            }
        }
        if let Some(w) = &weights {
            if !same_boundaries(w) {
                return Err(GbmError::Frame(
                    "weights column must share the frame's chunk boundaries".to_string(),
                ));
            }
        }

        let num_rows: usize = chunk_lengths.iter().sum();
        if num_rows == 0 {
            return Err(GbmError::EmptyFrame);
        }
        let chunk_size = chunk_lengths.first().copied().unwrap_or(0);
        let mut chunk_offsets = Vec::with_capacity(chunk_lengths.len());
        let mut acc = 0usize;
        for &len in &chunk_lengths {
            chunk_offsets.push(acc);
            acc += len;
        }

        let tree = (0..num_classes).map(|_| HugeDoubleArray::new(num_rows)).collect();
        let work = (0..num_classes).map(|_| HugeDoubleArray::new(num_rows)).collect();
        let nids = (0..num_classes)
            .map(|_| {
                let mut arr = HugeLongArray::new(num_rows);
                arr.fill(FRESH);
                arr
            })
            .collect();

        Ok(Self {
            feature_columns,
            response,
            weights,
            chunk_size,
            num_rows,
            chunk_lengths,
            chunk_offsets,
            tree,
            work,
            nids,
        })
    }

    // ---- Frame service interface (spec.md §6) ----

    pub fn num_chunks(&self) -> usize {
        self.chunk_lengths.len()
    }

    pub fn chunk_len(&self, chunk_idx: usize) -> usize {
        self.chunk_lengths[chunk_idx]
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_features(&self) -> usize {
        self.feature_columns.len()
    }

    pub fn num_classes(&self) -> usize {
        self.tree.len()
    }

    pub fn column_kind(&self, c: usize) -> ColumnKind {
        self.feature_columns[c].kind()
    }

    pub fn domain(&self, c: usize) -> &[String] {
        self.feature_columns[c].domain()
    }

    /// Dense doubles for feature column `c`, chunk `chunk_idx`.
    pub fn get_chunk(&self, c: usize, chunk_idx: usize) -> &[f64] {
        self.feature_columns[c].chunk(chunk_idx)
    }

    pub fn response_chunk(&self, chunk_idx: usize) -> &[f64] {
        self.response.chunk(chunk_idx)
    }

    /// Row weight, defaulting to 1.0 when no weights column is present.
    pub fn weight(&self, chunk_idx: usize, row_in_chunk: usize) -> f64 {
        match &self.weights {
            Some(w) => w.chunk(chunk_idx)[row_in_chunk],
            None => 1.0,
        }
    }

    /// Global row index of `row_in_chunk` within chunk `chunk_idx`.
    pub fn global_row(&self, chunk_idx: usize, row_in_chunk: usize) -> usize {
        self.chunk_lengths[..chunk_idx].iter().sum::<usize>() + row_in_chunk
    }

    /// Inverse of [`Self::global_row`]: maps a global row index back to its
    /// `(chunk_idx, row_in_chunk)` coordinates via binary search over the
    /// precomputed chunk offsets. Used by the histogram builder, residual,
    /// gamma and ensemble passes, all of which iterate rows by global index.
    pub fn chunk_of_row(&self, row: usize) -> (usize, usize) {
        let chunk_idx = match self.chunk_offsets.binary_search(&row) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (chunk_idx, row - self.chunk_offsets[chunk_idx])
    }

    /// Feature value for column `c` at global row `row`.
    pub fn feature_value(&self, c: usize, row: usize) -> f64 {
        let (chunk_idx, row_in_chunk) = self.chunk_of_row(row);
        self.feature_columns[c].chunk(chunk_idx)[row_in_chunk]
    }

    /// Response value at global row `row`.
    pub fn response_value(&self, row: usize) -> f64 {
        let (chunk_idx, row_in_chunk) = self.chunk_of_row(row);
        self.response.chunk(chunk_idx)[row_in_chunk]
    }

    /// Row weight at global row `row`, defaulting to 1.0 (see [`Self::weight`]).
    pub fn weight_for_row(&self, row: usize) -> f64 {
        let (chunk_idx, row_in_chunk) = self.chunk_of_row(row);
        self.weight(chunk_idx, row_in_chunk)
    }

    // ---- Scratch columns ----

    pub fn tree(&self, k: usize) -> &HugeDoubleArray {
        &self.tree[k]
    }

    pub fn tree_mut(&mut self, k: usize) -> &mut HugeDoubleArray {
        &mut self.tree[k]
    }

    pub fn work(&self, k: usize) -> &HugeDoubleArray {
        &self.work[k]
    }

    pub fn work_mut(&mut self, k: usize) -> &mut HugeDoubleArray {
        &mut self.work[k]
    }

    pub fn nids(&self, k: usize) -> &HugeLongArray {
        &self.nids[k]
    }

    pub fn nids_mut(&mut self, k: usize) -> &mut HugeLongArray {
        &mut self.nids[k]
    }

    /// Resets `NIDS[k]` to `FRESH` for every class, at the end of a round
    /// (spec.md §4.1 step 7 / §4.6).
    pub fn reset_nids_to_fresh(&mut self) {
        for arr in self.nids.iter_mut() {
            arr.fill(FRESH);
        }
    }

    /// Overwrites `WORK[k]` at the start of a round (spec.md §3 lifecycle).
    pub fn clear_work(&mut self) {
        for arr in self.work.iter_mut() {
            arr.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_frame() -> ChunkedFrame {
        let x1 = Column::numeric(vec![vec![1.0, -1.0], vec![2.0, -2.0]]);
        let y = Column::numeric(vec![vec![1.0, 0.0], vec![1.0, 0.0]]);
        ChunkedFrame::new(vec![x1], y, None, 1).unwrap()
    }

    #[test]
    fn new_frame_initializes_nids_to_fresh() {
        let frame = toy_frame();
        assert_eq!(frame.num_rows(), 4);
        assert_eq!(frame.num_chunks(), 2);
        for i in 0..4 {
            assert_eq!(frame.nids(0).get(i), FRESH);
        }
    }

    #[test]
    fn mismatched_chunk_boundaries_are_rejected() {
        let x1 = Column::numeric(vec![vec![1.0], vec![2.0, 3.0]]);
        let y = Column::numeric(vec![vec![1.0, 0.0], vec![1.0]]);
        let err = ChunkedFrame::new(vec![x1], y, None, 1).unwrap_err();
        assert!(matches!(err, GbmError::Frame(_)));
    }

    #[test]
    fn empty_frame_is_rejected() {
        let y = Column::numeric(vec![]);
        let err = ChunkedFrame::new(vec![], y, None, 1).unwrap_err();
        assert!(matches!(err, GbmError::EmptyFrame));
    }

    #[test]
    fn default_weight_is_one() {
        let frame = toy_frame();
        assert_eq!(frame.weight(0, 0), 1.0);
    }

    #[test]
    fn global_row_accounts_for_prior_chunks() {
        let frame = toy_frame();
        assert_eq!(frame.global_row(0, 1), 1);
        assert_eq!(frame.global_row(1, 0), 2);
    }

    #[test]
    fn chunk_of_row_is_the_inverse_of_global_row() {
        let frame = toy_frame();
        for chunk_idx in 0..frame.num_chunks() {
            for row_in_chunk in 0..frame.chunk_len(chunk_idx) {
                let row = frame.global_row(chunk_idx, row_in_chunk);
                assert_eq!(frame.chunk_of_row(row), (chunk_idx, row_in_chunk));
            }
        }
    }

    #[test]
    fn feature_and_response_value_match_the_underlying_chunk() {
        let frame = toy_frame();
        assert_eq!(frame.feature_value(0, 0), 1.0);
        assert_eq!(frame.feature_value(0, 2), 2.0);
        assert_eq!(frame.response_value(0), 1.0);
        assert_eq!(frame.response_value(3), 0.0);
    }
}
