use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Growth controls for a single decision tree.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TreeParams {
    /// Minimum number of records in either child of a split.
    pub mincut: usize,
    /// Nodes with fewer records than this are not split.
    pub minsize: usize,
    /// A split must reduce deviance by at least `mindev` times the root deviance.
    pub mindev: f64,
    /// Prune the grown tree to this many leaves.
    pub prune_to: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            mincut: 5,
            minsize: 10,
            mindev: 0.01,
            prune_to: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CvParams {
    pub k_folds: usize,
    pub cv_seed: u64,
}

impl Default for CvParams {
    fn default() -> Self {
        Self {
            k_folds: 10,
            cv_seed: 1,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct KnnParams {
    pub k: usize,
    pub metric: DistanceMetric,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self {
            k: 10,
            metric: DistanceMetric::Euclidean,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Features sampled per split; `None` means `floor(sqrt(n_features))`.
    pub mtry: Option<usize>,
    pub seed: u64,
    /// Minimum number of records in a terminal node.
    pub min_node_size: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 500,
            mtry: None,
            seed: 1,
            min_node_size: 1,
        }
    }
}

/// Where feature scaling parameters are estimated.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Fit on the training split, apply to both splits.
    #[default]
    TrainOnly,
    /// Fit on the whole dataset before splitting.
    FullDataset,
}

/// Supported model families and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    DecisionTree(TreeParams),
    Knn(KnnParams),
    RandomForest(ForestParams),
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::DecisionTree(TreeParams::default())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tree" | "decision_tree" => Ok(ModelType::DecisionTree(TreeParams::default())),
            "knn" => Ok(ModelType::Knn(KnnParams::default())),
            "forest" | "random_forest" => Ok(ModelType::RandomForest(ForestParams::default())),
            _ => Err(format!(
                "Unknown model type: {}. Valid options are: tree, knn, forest",
                s
            )),
        }
    }
}

/// Central configuration for one evaluation run.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    pub label_threshold: f64,
    pub score_column: String,
    /// Predictors removed (by name) before modelling.
    pub drop_features: Vec<String>,
    pub test_size: usize,
    pub split_seed: u64,
    pub scaling: ScalingMode,
    pub tree: TreeParams,
    pub cv: CvParams,
    pub knn: KnnParams,
    pub forest: ForestParams,
    /// `env_logger` filter installed by `run_harness`, e.g. `"info"`. Left
    /// unset, logging is up to the caller. `QUALITY_LOG` takes precedence.
    pub log_filter: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            label_threshold: 6.0,
            score_column: "quality".to_string(),
            drop_features: Vec::new(),
            test_size: 1000,
            split_seed: 1,
            scaling: ScalingMode::default(),
            tree: TreeParams::default(),
            cv: CvParams::default(),
            knn: KnnParams::default(),
            forest: ForestParams::default(),
            log_filter: None,
        }
    }
}

impl HarnessConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config = Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        let config: HarnessConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges that do not depend on the data.
    pub fn validate(&self) -> Result<(), EvalError> {
        let invalid = |msg: String| Err(EvalError::InvalidParameter(msg));

        if !self.label_threshold.is_finite() {
            return invalid("label_threshold must be finite".to_string());
        }
        if self.test_size == 0 {
            return invalid("test_size must be at least 1".to_string());
        }
        if self.tree.mincut == 0 {
            return invalid("tree.mincut must be at least 1".to_string());
        }
        if self.tree.minsize < 2 {
            return invalid(format!("tree.minsize must be at least 2, got {}", self.tree.minsize));
        }
        if !(self.tree.mindev >= 0.0) {
            return invalid(format!("tree.mindev must be non-negative, got {}", self.tree.mindev));
        }
        if self.cv.k_folds < 2 {
            return invalid(format!("cv.k_folds must be at least 2, got {}", self.cv.k_folds));
        }
        if self.knn.k == 0 {
            return invalid("knn.k must be at least 1".to_string());
        }
        if self.forest.n_trees == 0 {
            return invalid("forest.n_trees must be at least 1".to_string());
        }
        if self.forest.mtry == Some(0) {
            return invalid("forest.mtry must be at least 1".to_string());
        }
        if self.forest.min_node_size == 0 {
            return invalid("forest.min_node_size must be at least 1".to_string());
        }
        Ok(())
    }
}
