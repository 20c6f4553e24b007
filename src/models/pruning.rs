//! Misclassification pruning and its cross-validated size selection.
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data_handling::Dataset;
use crate::error::{EvalError, Result};
use crate::models::tree::{DecisionTree, DecisionTreeClassifier, NodeId, NodeKind};
use crate::split::kfold_indices;

impl DecisionTree {
    /// Collapse the twig whose removal adds the fewest training
    /// misclassifications, ties going to the earliest twig in pre-order.
    /// Returns the collapsed node, or `None` once the tree is a single leaf.
    pub fn collapse_weakest_twig(&mut self) -> Option<NodeId> {
        let mut best: Option<(usize, NodeId)> = None;
        for id in self.preorder() {
            let NodeKind::Split { left, right, .. } = self.node(id).kind else {
                continue;
            };
            let (l, r) = (self.node(left), self.node(right));
            if !(l.is_leaf() && r.is_leaf()) {
                continue;
            }
            // A merged leaf can never misclassify fewer records than its children.
            let increase = self.node(id).misclassified() - l.misclassified() - r.misclassified();
            if best.map_or(true, |(b, _)| increase < b) {
                best = Some((increase, id));
            }
        }
        let (_, id) = best?;
        self.collapse_twig(id);
        Some(id)
    }

    /// Copy of the tree pruned back to exactly `target` leaves.
    pub fn prune_to_size(&self, target: usize) -> Result<DecisionTree> {
        let leaves = self.leaf_count();
        if target < 1 || target > leaves {
            return Err(EvalError::InvalidTargetSize { target, leaves });
        }
        let mut pruned = self.clone();
        while pruned.leaf_count() > target {
            pruned.collapse_weakest_twig();
        }
        log::debug!(
            "Pruned tree from {} to {} leaves ({} training misclassifications)",
            leaves,
            target,
            pruned.training_misclassifications()
        );
        Ok(pruned)
    }

    /// Leaf counts and training misclassifications along the full pruning
    /// path, from the current size down to a single leaf.
    pub fn pruning_sequence(&self) -> Vec<(usize, usize)> {
        let mut tree = self.clone();
        let mut sequence = vec![(tree.leaf_count(), tree.training_misclassifications())];
        while tree.collapse_weakest_twig().is_some() {
            sequence.push((tree.leaf_count(), tree.training_misclassifications()));
        }
        sequence
    }
}

/// Held-out misclassifications per candidate tree size, summed over folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvPruneResult {
    /// Candidate leaf counts, largest first.
    pub sizes: Vec<usize>,
    pub misclassifications: Vec<usize>,
    pub best_size: usize,
    pub k_folds: usize,
}

impl CvPruneResult {
    pub fn curve(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.sizes
            .iter()
            .copied()
            .zip(self.misclassifications.iter().copied())
    }
}

/// Choose a pruned size for `tree` by k-fold cross-validation on `train`.
///
/// Each fold grows a tree with `classifier`'s growth parameters on the other
/// folds and walks its pruning path, counting errors on the held-out fold.
/// Sizes beyond a fold tree's own leaf count reuse its unpruned error.
pub fn cross_validate_prune(
    classifier: &DecisionTreeClassifier,
    train: &Dataset,
    tree: &DecisionTree,
    k_folds: usize,
    seed: u64,
) -> Result<CvPruneResult> {
    let max_size = tree.leaf_count();
    let folds = kfold_indices(train.len(), k_folds, seed)?;

    let per_fold: Vec<Vec<usize>> = folds
        .par_iter()
        .enumerate()
        .map(|(fold, held_out)| -> Result<Vec<usize>> {
            let mut in_fold = vec![false; train.len()];
            for &i in held_out {
                in_fold[i] = true;
            }
            let fit_idx: Vec<usize> = (0..train.len()).filter(|&i| !in_fold[i]).collect();
            let fit = train.select_rows(&fit_idx)?;
            let validation = train.select_rows(held_out)?;

            let mut fold_tree = classifier.grow_full(&fit)?;
            // errors[s - 1] holds the held-out misclassifications at s leaves.
            let mut errors = vec![0; max_size];
            let fold_size = fold_tree.leaf_count();
            if fold_size < max_size {
                let missed = fold_tree.misclassifications(&validation);
                errors[fold_size..].fill(missed);
            }
            loop {
                let size = fold_tree.leaf_count();
                if size <= max_size {
                    errors[size - 1] = fold_tree.misclassifications(&validation);
                }
                if fold_tree.collapse_weakest_twig().is_none() {
                    break;
                }
            }
            log::trace!(
                "CV pruning fold {}: {} leaves grown, {} held-out records, errors {:?}",
                fold,
                fold_size,
                validation.len(),
                errors
            );
            Ok(errors)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut totals = vec![0usize; max_size];
    for errors in &per_fold {
        for (total, e) in totals.iter_mut().zip(errors) {
            *total += e;
        }
    }

    // Ascending scan with strict improvement keeps the smallest size on ties.
    let mut best_size = 1;
    for size in 2..=max_size {
        if totals[size - 1] < totals[best_size - 1] {
            best_size = size;
        }
    }

    let sizes: Vec<usize> = (1..=max_size).rev().collect();
    let misclassifications = sizes.iter().map(|&s| totals[s - 1]).collect();
    log::debug!(
        "{}-fold CV over {} candidate sizes selected {} leaves",
        k_folds,
        max_size,
        best_size
    );

    Ok(CvPruneResult {
        sizes,
        misclassifications,
        best_size,
        k_folds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeParams;
    use crate::data_handling::Label;

    fn staircase() -> Dataset {
        // Alternating blocks of four give a tree with several leaves.
        let rows = (0..40)
            .map(|i| {
                let label = if (i / 4) % 2 == 0 { Label::Bad } else { Label::Good };
                (vec![i as f64], label)
            })
            .collect();
        Dataset::from_records(vec!["x".into()], rows).unwrap()
    }

    fn classifier() -> DecisionTreeClassifier {
        DecisionTreeClassifier::new(TreeParams {
            mincut: 1,
            minsize: 2,
            mindev: 0.0,
            prune_to: None,
        })
    }

    #[test]
    fn prune_to_size_rejects_out_of_range_targets() {
        let tree = classifier().fit_tree(&staircase()).unwrap();
        let leaves = tree.leaf_count();
        assert_eq!(
            tree.prune_to_size(0).unwrap_err(),
            EvalError::InvalidTargetSize { target: 0, leaves }
        );
        assert!(tree.prune_to_size(leaves + 1).is_err());
        assert_eq!(tree.prune_to_size(leaves).unwrap(), tree);
    }

    #[test]
    fn pruning_sequence_is_monotone() {
        let tree = classifier().fit_tree(&staircase()).unwrap();
        let seq = tree.pruning_sequence();
        assert_eq!(seq.first().unwrap().0, tree.leaf_count());
        assert_eq!(seq.last().unwrap().0, 1);
        for pair in seq.windows(2) {
            assert_eq!(pair[1].0 + 1, pair[0].0);
            assert!(pair[1].1 >= pair[0].1);
        }
    }

    #[test]
    fn cv_curve_covers_every_size() {
        let data = staircase();
        let tree = classifier().fit_tree(&data).unwrap();
        let cv = cross_validate_prune(&classifier(), &data, &tree, 5, 3).unwrap();
        assert_eq!(cv.sizes.len(), tree.leaf_count());
        assert_eq!(cv.sizes[0], tree.leaf_count());
        assert!(cv.best_size >= 1 && cv.best_size <= tree.leaf_count());
        let min = *cv.misclassifications.iter().min().unwrap();
        let at_best = cv.curve().find(|&(s, _)| s == cv.best_size).unwrap().1;
        assert_eq!(at_best, min);
    }
}
