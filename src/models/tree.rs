//! Binary decision tree grown greedily on deviance.
//!
//! Node deviance is `-2 Σ_k n_k ln(n_k / n)`. Because it is a sum over the
//! node's records, the deviance of a split (left + right) is already weighted
//! by child size, and the split gain is `D(parent) - D(left) - D(right)`.
//!
//! Nodes live in an arena indexed by `NodeId`; the root is node 0. Pruning
//! turns internal nodes back into leaves in place, leaving their former
//! descendants unreachable.
use rand::rngs::StdRng;
use rand::seq::index::sample;

use crate::config::TreeParams;
use crate::data_handling::{Dataset, Label};
use crate::error::{EvalError, Result};
use crate::math::Array2;
use crate::models::classifier_trait::{Classifier, FittedModel};

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Leaf,
    /// Records with `value <= threshold` go left, the rest go right.
    Split {
        feature: usize,
        threshold: f64,
        left: NodeId,
        right: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub kind: NodeKind,
    /// Training records of each class that reached this node.
    pub n_good: usize,
    pub n_bad: usize,
    pub deviance: f64,
    pub depth: usize,
}

impl TreeNode {
    pub fn n_samples(&self) -> usize {
        self.n_good + self.n_bad
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }

    /// Majority label of the node's training records.
    pub fn label(&self) -> Label {
        Label::majority(self.n_good, self.n_bad)
    }

    /// Proportion of `Good` among the node's training records.
    pub fn score(&self) -> f64 {
        self.n_good as f64 / self.n_samples() as f64
    }

    /// Training records misclassified if this node were a leaf.
    pub fn misclassified(&self) -> usize {
        match self.label() {
            Label::Good => self.n_bad,
            Label::Bad => self.n_good,
        }
    }
}

/// Deviance of a node holding the given class counts.
pub fn deviance(n_good: usize, n_bad: usize) -> f64 {
    let n = (n_good + n_bad) as f64;
    let term = |k: usize| {
        if k == 0 {
            0.0
        } else {
            let k = k as f64;
            k * (k / n).ln()
        }
    };
    -2.0 * (term(n_good) + term(n_bad))
}

/// Stopping rules shared by single trees and forest members.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GrowthParams {
    pub min_split: usize,
    pub min_leaf: usize,
    pub min_dev: f64,
    /// Features sampled per split; `None` considers all of them.
    pub max_features: Option<usize>,
}

impl From<&TreeParams> for GrowthParams {
    fn from(p: &TreeParams) -> Self {
        Self {
            min_split: p.minsize,
            min_leaf: p.mincut.max(1),
            min_dev: p.mindev,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
    n_leaves: usize,
}

impl DecisionTree {
    /// Grow a tree on every record of `data`. `rng` drives per-split feature
    /// sampling and is only consulted when `params.max_features` is set.
    pub(crate) fn grow(data: &Dataset, params: GrowthParams, rng: Option<StdRng>) -> Self {
        let (n_good, n_bad) = data.class_counts();
        let mut grower = Grower {
            x: &data.x,
            y: &data.y,
            params,
            min_gain: params.min_dev * deviance(n_good, n_bad),
            rng,
            nodes: Vec::new(),
        };
        grower.grow((0..data.len()).collect(), 0);

        let nodes = grower.nodes;
        let n_leaves = nodes.iter().filter(|n| n.is_leaf()).count();
        DecisionTree {
            nodes,
            n_features: data.n_features(),
            n_leaves,
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn leaf_count(&self) -> usize {
        self.n_leaves
    }

    /// Reachable node ids in pre-order (node, left subtree, right subtree).
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![0];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let NodeKind::Split { left, right, .. } = self.nodes[id].kind {
                stack.push(right);
                stack.push(left);
            }
        }
        order
    }

    pub fn depth(&self) -> usize {
        self.preorder()
            .into_iter()
            .filter(|&id| self.nodes[id].is_leaf())
            .map(|id| self.nodes[id].depth)
            .max()
            .unwrap_or(0)
    }

    /// Leaf reached by descending from the root.
    pub fn leaf_for(&self, features: &[f64]) -> &TreeNode {
        let mut node = &self.nodes[0];
        while let NodeKind::Split {
            feature,
            threshold,
            left,
            right,
        } = node.kind
        {
            node = if features[feature] <= threshold {
                &self.nodes[left]
            } else {
                &self.nodes[right]
            };
        }
        node
    }

    /// Sum of leaf misclassifications over the training records.
    pub fn training_misclassifications(&self) -> usize {
        self.preorder()
            .into_iter()
            .map(|id| &self.nodes[id])
            .filter(|n| n.is_leaf())
            .map(TreeNode::misclassified)
            .sum()
    }

    /// Misclassified records of `data`.
    pub fn misclassifications(&self, data: &Dataset) -> usize {
        data.records()
            .filter(|r| self.leaf_for(r.features).label() != r.label)
            .count()
    }

    /// Deviance reduction attributed to each feature, summed over reachable splits.
    pub fn split_gains(&self) -> Vec<f64> {
        let mut gains = vec![0.0; self.n_features];
        for id in self.preorder() {
            let node = &self.nodes[id];
            if let NodeKind::Split {
                feature,
                left,
                right,
                ..
            } = node.kind
            {
                gains[feature] +=
                    node.deviance - self.nodes[left].deviance - self.nodes[right].deviance;
            }
        }
        gains
    }

    /// `split_gains` normalized to sum to one (all zeros for a single leaf).
    pub fn feature_importance(&self) -> Vec<f64> {
        normalize(self.split_gains())
    }

    /// Sorted indices of the features the tree splits on.
    pub fn used_features(&self) -> Vec<usize> {
        let mut used: Vec<usize> = self
            .preorder()
            .into_iter()
            .filter_map(|id| match self.nodes[id].kind {
                NodeKind::Split { feature, .. } => Some(feature),
                NodeKind::Leaf => None,
            })
            .collect();
        used.sort_unstable();
        used.dedup();
        used
    }

    /// Turn an internal node whose children are both leaves into a leaf.
    pub(crate) fn collapse_twig(&mut self, id: NodeId) {
        if let NodeKind::Split { left, right, .. } = self.nodes[id].kind {
            debug_assert!(self.nodes[left].is_leaf() && self.nodes[right].is_leaf());
            self.nodes[id].kind = NodeKind::Leaf;
            self.n_leaves -= 1;
        }
    }
}

impl FittedModel for DecisionTree {
    fn predict_label(&self, features: &[f64]) -> Label {
        self.leaf_for(features).label()
    }

    fn predict_score(&self, features: &[f64]) -> f64 {
        self.leaf_for(features).score()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

pub(crate) fn normalize(mut values: Vec<f64>) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
    values
}

struct Grower<'a> {
    x: &'a Array2<f64>,
    y: &'a [Label],
    params: GrowthParams,
    min_gain: f64,
    rng: Option<StdRng>,
    nodes: Vec<TreeNode>,
}

impl<'a> Grower<'a> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> NodeId {
        let n_good = indices.iter().filter(|&&i| self.y[i].is_good()).count();
        let n_bad = indices.len() - n_good;
        let node_deviance = deviance(n_good, n_bad);

        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            kind: NodeKind::Leaf,
            n_good,
            n_bad,
            deviance: node_deviance,
            depth,
        });

        if indices.len() < self.params.min_split || n_good == 0 || n_bad == 0 {
            return id;
        }

        let features = self.candidate_features();
        let Some(best) = best_split(
            self.x,
            self.y,
            &indices,
            &features,
            node_deviance,
            self.params.min_leaf,
        ) else {
            return id;
        };
        if best.gain <= 0.0 || best.gain < self.min_gain {
            return id;
        }

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[(i, best.feature)] <= best.threshold);
        if left_idx.is_empty() || right_idx.is_empty() {
            return id;
        }

        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[id].kind = NodeKind::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let p = self.x.ncols();
        match (self.params.max_features, self.rng.as_mut()) {
            (Some(mtry), Some(rng)) if mtry < p => {
                let mut features = sample(rng, p, mtry).into_vec();
                features.sort_unstable();
                features
            }
            _ => (0..p).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Best admissible split over `features`, scanning features in the given
/// order and thresholds in ascending order; only a strictly larger gain
/// replaces the current best.
fn best_split(
    x: &Array2<f64>,
    y: &[Label],
    indices: &[usize],
    features: &[usize],
    parent_deviance: f64,
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = indices.len();
    if n < 2 {
        return None;
    }
    let total_good = indices.iter().filter(|&&i| y[i].is_good()).count();

    let mut best: Option<SplitCandidate> = None;
    let mut order = indices.to_vec();

    for &feature in features {
        order.sort_by(|&a, &b| x[(a, feature)].total_cmp(&x[(b, feature)]));

        let mut left_good = 0;
        for pos in 0..n - 1 {
            if y[order[pos]].is_good() {
                left_good += 1;
            }
            let value = x[(order[pos], feature)];
            let next = x[(order[pos + 1], feature)];
            if value == next {
                continue;
            }

            let left_n = pos + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let right_good = total_good - left_good;
            let gain = parent_deviance
                - deviance(left_good, left_n - left_good)
                - deviance(right_good, right_n - right_good);

            if best.map_or(true, |b| gain > b.gain) {
                let mut threshold = value / 2.0 + next / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                if !threshold.is_finite() {
                    continue;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
    }

    best
}

/// Deviance-split decision tree, optionally pruned to a fixed leaf count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecisionTreeClassifier {
    pub params: TreeParams,
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams) -> Self {
        Self { params }
    }

    pub fn with_prune_to(mut self, leaves: usize) -> Self {
        self.params.prune_to = Some(leaves);
        self
    }

    pub(crate) fn growth_params(&self) -> GrowthParams {
        GrowthParams::from(&self.params)
    }

    /// Grow the unpruned tree on `train`.
    pub fn grow_full(&self, train: &Dataset) -> Result<DecisionTree> {
        if !(self.params.mindev >= 0.0) {
            return Err(EvalError::InvalidParameter(format!(
                "mindev must be non-negative, got {}",
                self.params.mindev
            )));
        }
        let tree = DecisionTree::grow(train, self.growth_params(), None);
        log::debug!(
            "Grew decision tree on {} records: {} leaves, depth {}, {} training misclassifications",
            train.len(),
            tree.leaf_count(),
            tree.depth(),
            tree.training_misclassifications()
        );
        Ok(tree)
    }

    /// Grow on `train` and, when `prune_to` is set, prune to that many leaves.
    pub fn fit_tree(&self, train: &Dataset) -> Result<DecisionTree> {
        let tree = self.grow_full(train)?;
        match self.params.prune_to {
            Some(target) => tree.prune_to_size(target),
            None => Ok(tree),
        }
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit<'a>(&self, train: &'a Dataset) -> Result<Box<dyn FittedModel + 'a>> {
        Ok(Box::new(self.fit_tree(train)?))
    }

    fn name(&self) -> String {
        match self.params.prune_to {
            Some(leaves) => format!("decision_tree_pruned_{}", leaves),
            None => "decision_tree".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(rows: Vec<(Vec<f64>, Label)>) -> Dataset {
        let p = rows[0].0.len();
        let names = (0..p).map(|i| format!("f{}", i)).collect();
        Dataset::from_records(names, rows).unwrap()
    }

    fn loose() -> TreeParams {
        TreeParams {
            mincut: 1,
            minsize: 2,
            mindev: 0.0,
            prune_to: None,
        }
    }

    #[test]
    fn deviance_of_pure_and_balanced_nodes() {
        assert_eq!(deviance(5, 0), 0.0);
        assert!((deviance(2, 2) - 8.0 * std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn pure_node_is_a_single_leaf() {
        let ds = dataset(vec![
            (vec![1.0], Label::Good),
            (vec![2.0], Label::Good),
            (vec![3.0], Label::Good),
        ]);
        let tree = DecisionTreeClassifier::new(loose()).fit_tree(&ds).unwrap();
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.predict_score(&[10.0]), 1.0);
    }

    #[test]
    fn threshold_is_midpoint_and_left_is_inclusive() {
        let ds = dataset(vec![
            (vec![1.0], Label::Bad),
            (vec![2.0], Label::Bad),
            (vec![4.0], Label::Good),
            (vec![5.0], Label::Good),
        ]);
        let tree = DecisionTreeClassifier::new(loose()).fit_tree(&ds).unwrap();
        match tree.root().kind {
            NodeKind::Split {
                feature, threshold, ..
            } => {
                assert_eq!(feature, 0);
                assert_eq!(threshold, 3.0);
            }
            NodeKind::Leaf => panic!("expected a split"),
        }
        assert_eq!(tree.predict_label(&[3.0]), Label::Bad);
        assert_eq!(tree.predict_label(&[3.0001]), Label::Good);
    }

    #[test]
    fn equal_gain_prefers_lower_feature_index() {
        // Both columns separate the classes perfectly.
        let ds = dataset(vec![
            (vec![0.0, 10.0], Label::Bad),
            (vec![1.0, 11.0], Label::Bad),
            (vec![2.0, 12.0], Label::Good),
            (vec![3.0, 13.0], Label::Good),
        ]);
        let tree = DecisionTreeClassifier::new(loose()).fit_tree(&ds).unwrap();
        assert_eq!(tree.used_features(), vec![0]);
    }

    #[test]
    fn mincut_blocks_small_children() {
        let ds = dataset(vec![
            (vec![0.0], Label::Bad),
            (vec![1.0], Label::Good),
            (vec![2.0], Label::Good),
            (vec![3.0], Label::Good),
        ]);
        let params = TreeParams {
            mincut: 2,
            ..loose()
        };
        let tree = DecisionTreeClassifier::new(params).fit_tree(&ds).unwrap();
        match tree.root().kind {
            NodeKind::Split { left, right, .. } => {
                assert!(tree.node(left).n_samples() >= 2);
                assert!(tree.node(right).n_samples() >= 2);
            }
            NodeKind::Leaf => {}
        }
    }

    #[test]
    fn minsize_stops_growth() {
        let ds = dataset(vec![
            (vec![0.0], Label::Bad),
            (vec![1.0], Label::Good),
            (vec![2.0], Label::Bad),
        ]);
        let params = TreeParams {
            minsize: 4,
            ..loose()
        };
        let tree = DecisionTreeClassifier::new(params).fit_tree(&ds).unwrap();
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.root().label(), Label::Bad);
    }

    #[test]
    fn mindev_relative_to_root_stops_weak_splits() {
        // The only split reduces deviance by a small fraction of the root deviance.
        let mut rows = Vec::new();
        for i in 0..20 {
            let label = if i % 2 == 0 { Label::Good } else { Label::Bad };
            rows.push((vec![i as f64], label));
        }
        let ds = dataset(rows);
        let params = TreeParams {
            mindev: 0.5,
            ..loose()
        };
        let tree = DecisionTreeClassifier::new(params).fit_tree(&ds).unwrap();
        assert_eq!(tree.leaf_count(), 1);
    }

    #[test]
    fn infinite_neighbour_yields_no_threshold() {
        let x = Array2::from_shape_vec((3, 1), vec![f64::NEG_INFINITY, 1.0, 2.0]).unwrap();
        let y = [Label::Bad, Label::Good, Label::Good];
        let best = best_split(&x, &y, &[0, 1, 2], &[0], deviance(2, 1), 1).unwrap();
        assert_eq!(best.threshold, 1.5);
    }

    #[test]
    fn extreme_values_keep_a_finite_threshold() {
        let ds = dataset(vec![
            (vec![-f64::MAX], Label::Bad),
            (vec![f64::MAX], Label::Good),
        ]);
        let tree = DecisionTreeClassifier::new(loose()).fit_tree(&ds).unwrap();
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.predict_label(&[1.0]), Label::Good);
        assert_eq!(tree.predict_label(&[-1.0]), Label::Bad);
    }

    #[test]
    fn importance_is_normalized() {
        let ds = dataset(vec![
            (vec![0.0, 5.0], Label::Bad),
            (vec![1.0, 3.0], Label::Bad),
            (vec![2.0, 4.0], Label::Good),
            (vec![3.0, 1.0], Label::Good),
        ]);
        let tree = DecisionTreeClassifier::new(loose()).fit_tree(&ds).unwrap();
        let imp = tree.feature_importance();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(imp[0], 1.0);
    }
}
