//! Append-only tree node arena (`DTree`, spec.md §3 / §4.2).

use crate::gbm::histogram::DHistogram;

/// A node's built histograms, tagged with the feature column each one was
/// built from (the histogram builder only builds histograms for a tree's
/// sampled column subset, so the column index must travel with each one;
/// see spec.md §4.3 and `gbm::histogram_builder`).
pub type HistogramSet = Vec<(usize, DHistogram)>;

/// How NA-valued rows are routed across a split, per spec.md §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaDirection {
    /// NA rows join the majority-weight side.
    Left,
    /// NA rows join the minority-weight side.
    Right,
    /// NA rows form their own arm, compared against all non-NA rows.
    VsRest,
}

/// The predicate recorded on a `Decided` node.
#[derive(Debug, Clone)]
pub enum SplitPredicate {
    /// Numeric split: rows with `value <= threshold` go left.
    Threshold { column: usize, threshold: f64 },
    /// Categorical split: rows whose level is in `left_levels` go left.
    Bitset { column: usize, left_levels: Vec<bool> },
}

/// One node in a tree's arena.
#[derive(Debug, Clone)]
pub enum Node {
    /// Frontier node awaiting split selection; owns per-feature histograms
    /// built during the current layer pass.
    Undecided { histograms: HistogramSet },
    /// A split has been chosen; routes rows to `nid_left`/`nid_right`.
    Decided {
        predicate: SplitPredicate,
        na_direction: NaDirection,
        nid_left: usize,
        nid_right: usize,
    },
    /// A terminal node holding the fitted constant prediction.
    Leaf { prediction: f64 },
}

/// An append-only arena of nodes for one class's tree in one round.
///
/// Parent/child links are index pairs into `nodes`; the root is always index
/// 0. No node is ever moved or removed within a round (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct DTree {
    nodes: Vec<Node>,
}

impl DTree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Creates a tree with a single undecided root node.
    pub fn with_root(histograms: HistogramSet) -> Self {
        let mut tree = Self::new();
        tree.nodes.push(Node::Undecided { histograms });
        tree
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: usize) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Appends a node, returning its new id.
    pub fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Mutates an undecided node into `Decided`, appending two fresh
    /// undecided children with the given histograms. Returns
    /// `(nid_left, nid_right)`. Panics if `id` is not `Undecided` — the
    /// split finder is the only caller and always checks first.
    pub fn decide(
        &mut self,
        id: usize,
        predicate: SplitPredicate,
        na_direction: NaDirection,
        left_histograms: HistogramSet,
        right_histograms: HistogramSet,
    ) -> (usize, usize) {
        assert!(
            matches!(self.nodes[id], Node::Undecided { .. }),
            "decide() called on a non-undecided node"
        );
        let nid_left = self.push(Node::Undecided {
            histograms: left_histograms,
        });
        let nid_right = self.push(Node::Undecided {
            histograms: right_histograms,
        });
        debug_assert!(nid_left > id && nid_right > id);
        self.nodes[id] = Node::Decided {
            predicate,
            na_direction,
            nid_left,
            nid_right,
        };
        (nid_left, nid_right)
    }

    /// Converts an undecided node into a leaf with prediction 0 (spec.md
    /// §4.2: "Nodes that cannot split become Leaves with prediction 0",
    /// later overwritten by the gamma pass).
    pub fn make_leaf(&mut self, id: usize) {
        self.nodes[id] = Node::Leaf { prediction: 0.0 };
    }

    /// Ids of nodes in range `[from, self.len())` that are still undecided —
    /// the layer the histogram builder operates on next (spec.md §4.3).
    pub fn undecided_in_range(&self, from: usize) -> Vec<usize> {
        (from..self.nodes.len())
            .filter(|&id| matches!(self.nodes[id], Node::Undecided { .. }))
            .collect()
    }

    /// Routes a row currently at `from_nid` through a decided node to its
    /// child, given the row's feature values (indexed by column). Returns
    /// `UNDECIDED_CHILD`-style: the new child id, or `from_nid` unchanged if
    /// it is not decided (leaf or still undecided).
    pub fn route<F>(&self, from_nid: usize, feature_value: F) -> usize
    where
        F: Fn(usize) -> Option<f64>,
    {
        match &self.nodes[from_nid] {
            Node::Decided {
                predicate,
                na_direction,
                nid_left,
                nid_right,
            } => {
                let goes_left = match predicate {
                    SplitPredicate::Threshold { column, threshold } => {
                        match feature_value(*column) {
                            Some(v) => v <= *threshold,
                            None => matches!(na_direction, NaDirection::Left),
                        }
                    }
                    SplitPredicate::Bitset { column, left_levels } => match feature_value(*column) {
                        Some(v) => {
                            let level = v.round() as i64;
                            level >= 0
                                && (level as usize) < left_levels.len()
                                && left_levels[level as usize]
                        }
                        None => matches!(na_direction, NaDirection::Left),
                    },
                };
                if goes_left {
                    *nid_left
                } else {
                    *nid_right
                }
            }
            _ => from_nid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_root_starts_with_one_undecided_node_at_index_zero() {
        let tree = DTree::with_root(vec![]);
        assert_eq!(tree.root(), 0);
        assert_eq!(tree.len(), 1);
        assert!(matches!(tree.node(0), Node::Undecided { .. }));
    }

    #[test]
    fn decide_appends_two_children_with_ids_greater_than_parent() {
        let mut tree = DTree::with_root(vec![]);
        let (l, r) = tree.decide(
            0,
            SplitPredicate::Threshold {
                column: 0,
                threshold: 0.5,
            },
            NaDirection::Left,
            vec![],
            vec![],
        );
        assert!(l > 0 && r > 0);
        assert!(matches!(tree.node(0), Node::Decided { .. }));
        assert!(matches!(tree.node(l), Node::Undecided { .. }));
        assert!(matches!(tree.node(r), Node::Undecided { .. }));
    }

    #[test]
    fn route_follows_threshold_predicate() {
        let mut tree = DTree::with_root(vec![]);
        tree.decide(
            0,
            SplitPredicate::Threshold {
                column: 0,
                threshold: 0.5,
            },
            NaDirection::Left,
            vec![],
            vec![],
        );
        let left = tree.route(0, |_| Some(0.1));
        let right = tree.route(0, |_| Some(0.9));
        assert_ne!(left, right);
        assert_eq!(tree.route(0, |_| None), left); // NA_LEFT
    }

    #[test]
    fn make_leaf_replaces_undecided_with_zero_prediction() {
        let mut tree = DTree::with_root(vec![]);
        tree.make_leaf(0);
        assert!(matches!(tree.node(0), Node::Leaf { prediction } if *prediction == 0.0));
    }

    #[test]
    fn undecided_in_range_only_returns_frontier_nodes() {
        let mut tree = DTree::with_root(vec![]);
        tree.decide(
            0,
            SplitPredicate::Threshold {
                column: 0,
                threshold: 0.0,
            },
            NaDirection::Left,
            vec![],
            vec![],
        );
        assert_eq!(tree.undecided_in_range(0), vec![1, 2]);
    }
}
