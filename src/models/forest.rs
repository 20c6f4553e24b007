//! Bagged ensemble of deviance trees with per-split feature sampling.
//!
//! Tree `t` draws its bootstrap sample and its split features from
//! `StdRng::seed_from_u64(seed + t)`, so the fitted forest does not depend on
//! how rayon schedules the trees.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::ForestParams;
use crate::data_handling::{Dataset, Label};
use crate::error::{EvalError, Result};
use crate::models::classifier_trait::{Classifier, FittedModel};
use crate::models::tree::{normalize, DecisionTree, GrowthParams};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RandomForestClassifier {
    pub params: ForestParams,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }

    /// Features sampled per split for a dataset with `n_features` columns.
    pub fn mtry(&self, n_features: usize) -> Result<usize> {
        match self.params.mtry {
            None => Ok(((n_features as f64).sqrt().floor() as usize).max(1)),
            Some(m) if m >= 1 && m <= n_features => Ok(m),
            Some(m) => Err(EvalError::InvalidParameter(format!(
                "mtry must be in 1..={}, got {}",
                n_features, m
            ))),
        }
    }

    pub fn fit_forest(&self, train: &Dataset) -> Result<RandomForest> {
        let n_trees = self.params.n_trees;
        if n_trees == 0 {
            return Err(EvalError::InvalidParameter(
                "n_trees must be at least 1".to_string(),
            ));
        }
        let min_node_size = self.params.min_node_size.max(1);
        let growth = GrowthParams {
            min_split: 2 * min_node_size,
            min_leaf: min_node_size,
            min_dev: 0.0,
            max_features: Some(self.mtry(train.n_features())?),
        };
        let n = train.len();

        let grown: Vec<(DecisionTree, Vec<usize>)> = (0..n_trees)
            .into_par_iter()
            .map(|t| -> Result<(DecisionTree, Vec<usize>)> {
                let mut rng = StdRng::seed_from_u64(self.params.seed.wrapping_add(t as u64));
                let mut in_bag = vec![false; n];
                let bootstrap: Vec<usize> = (0..n)
                    .map(|_| {
                        let i = rng.gen_range(0..n);
                        in_bag[i] = true;
                        i
                    })
                    .collect();
                let sample = train.select_rows(&bootstrap)?;
                let tree = DecisionTree::grow(&sample, growth, Some(rng));
                let out_of_bag: Vec<usize> = (0..n).filter(|&i| !in_bag[i]).collect();
                Ok((tree, out_of_bag))
            })
            .collect::<Result<Vec<_>>>()?;

        let (trees, oob_indices): (Vec<_>, Vec<_>) = grown.into_iter().unzip();
        let mut forest = RandomForest {
            trees,
            oob_indices,
            n_features: train.n_features(),
            oob_error: None,
        };
        forest.oob_error = forest.compute_oob_error(train);

        log::debug!(
            "Grew random forest: {} trees, mtry {}, mean {:.1} leaves, OOB error {}",
            n_trees,
            growth.max_features.unwrap_or(0),
            forest.trees.iter().map(|t| t.leaf_count()).sum::<usize>() as f64 / n_trees as f64,
            forest
                .oob_error
                .map_or_else(|| "n/a".to_string(), |e| format!("{:.4}", e))
        );
        Ok(forest)
    }
}

impl Classifier for RandomForestClassifier {
    fn fit<'a>(&self, train: &'a Dataset) -> Result<Box<dyn FittedModel + 'a>> {
        Ok(Box::new(self.fit_forest(train)?))
    }

    fn name(&self) -> String {
        format!("random_forest_{}", self.params.n_trees)
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    /// Training rows left out of each tree's bootstrap sample.
    oob_indices: Vec<Vec<usize>>,
    n_features: usize,
    oob_error: Option<f64>,
}

impl RandomForest {
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Misclassification rate of out-of-bag majority votes, over training
    /// records that were out of bag for at least one tree.
    pub fn oob_error(&self) -> Option<f64> {
        self.oob_error
    }

    /// Deviance reduction per feature summed over every tree, normalized to one.
    pub fn feature_importance(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, g) in total.iter_mut().zip(tree.split_gains()) {
                *acc += g;
            }
        }
        normalize(total)
    }

    /// `(name, importance)` pairs, most important first.
    pub fn ranked_importance(&self, feature_names: &[String]) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = feature_names
            .iter()
            .cloned()
            .zip(self.feature_importance())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    fn compute_oob_error(&self, train: &Dataset) -> Option<f64> {
        let mut good = vec![0usize; train.len()];
        let mut votes = vec![0usize; train.len()];
        for (tree, oob) in self.trees.iter().zip(&self.oob_indices) {
            for &i in oob {
                votes[i] += 1;
                if tree.leaf_for(train.features(i)).label().is_good() {
                    good[i] += 1;
                }
            }
        }

        let mut counted = 0;
        let mut wrong = 0;
        for i in 0..train.len() {
            if votes[i] == 0 {
                continue;
            }
            counted += 1;
            if Label::majority(good[i], votes[i] - good[i]) != train.label(i) {
                wrong += 1;
            }
        }
        (counted > 0).then(|| wrong as f64 / counted as f64)
    }
}

impl FittedModel for RandomForest {
    fn predict_label(&self, features: &[f64]) -> Label {
        let good = self
            .trees
            .iter()
            .filter(|t| t.leaf_for(features).label().is_good())
            .count();
        Label::majority(good, self.trees.len() - good)
    }

    fn predict_score(&self, features: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.leaf_for(features).score()).sum();
        sum / self.trees.len() as f64
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}
