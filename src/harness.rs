//! End-to-end comparison run: one split, four models, one evaluator.
use std::time::Instant;

use anyhow::{Context, Result};

use crate::config::{HarnessConfig, ModelType, ScalingMode, TreeParams};
use crate::data_handling::{Dataset, RawTable};
use crate::error::EvalError;
use crate::evaluation::{evaluate_detailed, Evaluation, ResultsTable};
use crate::logging::init_logging;
use crate::models::classifier_trait::{Classifier, FittedModel};
use crate::models::factory::build_model;
use crate::models::forest::RandomForestClassifier;
use crate::models::pruning::{cross_validate_prune, CvPruneResult};
use crate::models::tree::DecisionTreeClassifier;
use crate::preprocessing::{binarize_label, fit_scaler, scale_features};
use crate::split::{train_test_split, Split};
use crate::stats::RocCurve;

/// Everything a run produces besides log output.
#[derive(Debug, Clone)]
pub struct HarnessReport {
    /// One record per model, in evaluation order.
    pub results: ResultsTable,
    pub cv: CvPruneResult,
    pub full_tree_leaves: usize,
    /// Predictors the pruned tree still splits on.
    pub pruned_tree_features: Vec<String>,
    /// Forest importances, most important first.
    pub forest_importance: Vec<(String, f64)>,
    pub forest_oob_error: Option<f64>,
    pub roc_curves: Vec<(String, RocCurve)>,
}

/// Binarize the score column and drop the configured predictors.
pub fn prepare_dataset(raw: &RawTable, config: &HarnessConfig) -> Result<Dataset, EvalError> {
    let dataset = binarize_label(raw, config.label_threshold, &config.score_column)?;
    if config.drop_features.is_empty() {
        Ok(dataset)
    } else {
        dataset.drop_features(&config.drop_features)
    }
}

/// Split and standardize according to `config.scaling`.
pub fn prepare_split(dataset: &Dataset, config: &HarnessConfig) -> Result<Split, EvalError> {
    match config.scaling {
        ScalingMode::FullDataset => {
            let scaled = scale_features(dataset)?;
            train_test_split(&scaled, config.test_size, config.split_seed)
        }
        ScalingMode::TrainOnly => {
            let split = train_test_split(dataset, config.test_size, config.split_seed)?;
            let scaler = fit_scaler(&split.train)?;
            Ok(Split {
                train: scaler.transform(&split.train)?,
                test: scaler.transform(&split.test)?,
                ..split
            })
        }
    }
}

struct Collector<'s> {
    split: &'s Split,
    results: ResultsTable,
    roc_curves: Vec<(String, RocCurve)>,
}

impl<'s> Collector<'s> {
    fn context(&self, model_id: &str) -> String {
        format!(
            "model '{}' (split seed {}, test size {})",
            model_id, self.split.seed, self.split.test_size
        )
    }

    fn record(&mut self, classifier: &dyn Classifier, model: &dyn FittedModel) -> Result<Evaluation> {
        let model_id = classifier.name();
        let evaluation = evaluate_detailed(classifier, model, &self.split.test)
            .with_context(|| format!("Failed to evaluate {}", self.context(&model_id)))?;
        self.results.push(evaluation.record.clone());
        self.roc_curves.push((model_id, evaluation.roc.clone()));
        Ok(evaluation)
    }
}

/// Prepare `raw`, split it once, then fit and evaluate the full tree, the
/// cross-validation pruned tree, k-NN and the random forest on that split.
pub fn run_harness(raw: &RawTable, config: &HarnessConfig) -> Result<HarnessReport> {
    if let Some(filter) = &config.log_filter {
        if !init_logging(filter) {
            log::debug!("Logger already installed, ignoring log_filter '{}'", filter);
        }
    }
    config.validate().context("Invalid harness configuration")?;

    let dataset = prepare_dataset(raw, config).context("Failed to prepare dataset")?;
    dataset.log_summary("Prepared dataset");

    let split = prepare_split(&dataset, config).with_context(|| {
        format!(
            "Failed to split dataset (seed {}, test size {})",
            config.split_seed, config.test_size
        )
    })?;
    split.train.log_summary("Training split");
    split.test.log_summary("Test split");

    let mut collector = Collector {
        split: &split,
        results: ResultsTable::new(),
        roc_curves: Vec::new(),
    };

    // Unpruned tree
    log::info!("Growing decision tree");
    let start = Instant::now();
    let tree_clf = DecisionTreeClassifier::new(TreeParams {
        prune_to: None,
        ..config.tree.clone()
    });
    let full_tree = tree_clf
        .fit_tree(&split.train)
        .with_context(|| format!("Failed to fit {}", collector.context(&tree_clf.name())))?;
    log::debug!("Tree grown in {:?}", start.elapsed());
    collector.record(&tree_clf, &full_tree)?;

    // Cross-validated pruning
    log::info!("Cross-validating tree size over {} folds", config.cv.k_folds);
    let start = Instant::now();
    let cv = cross_validate_prune(
        &tree_clf,
        &split.train,
        &full_tree,
        config.cv.k_folds,
        config.cv.cv_seed,
    )
    .with_context(|| format!("Failed to cross-validate {}", collector.context(&tree_clf.name())))?;
    log::debug!("Cross-validation finished in {:?}", start.elapsed());

    let target = config.tree.prune_to.unwrap_or(cv.best_size);
    let pruned_clf = tree_clf.clone().with_prune_to(target);
    let pruned_tree = full_tree
        .prune_to_size(target)
        .with_context(|| format!("Failed to prune {}", collector.context(&pruned_clf.name())))?;
    let pruned_tree_features: Vec<String> = pruned_tree
        .used_features()
        .into_iter()
        .map(|f| split.train.feature_names[f].clone())
        .collect();
    log::info!(
        "Pruned tree keeps {} leaves using: {}",
        pruned_tree.leaf_count(),
        pruned_tree_features.join(", ")
    );
    collector.record(&pruned_clf, &pruned_tree)?;

    // k-NN
    log::info!("Evaluating k-NN with k = {}", config.knn.k);
    let start = Instant::now();
    let knn_clf = build_model(&ModelType::Knn(config.knn.clone()));
    let knn = knn_clf
        .fit(&split.train)
        .with_context(|| format!("Failed to fit {}", collector.context(&knn_clf.name())))?;
    collector.record(knn_clf.as_ref(), knn.as_ref())?;
    log::debug!("k-NN evaluated in {:?}", start.elapsed());

    // Random forest
    log::info!("Growing random forest of {} trees", config.forest.n_trees);
    let start = Instant::now();
    let forest_clf = RandomForestClassifier::new(config.forest.clone());
    let forest = forest_clf
        .fit_forest(&split.train)
        .with_context(|| format!("Failed to fit {}", collector.context(&forest_clf.name())))?;
    log::debug!("Forest grown in {:?}", start.elapsed());
    collector.record(&forest_clf, &forest)?;
    let forest_importance = forest.ranked_importance(&split.train.feature_names);

    if let Some(best) = collector.results.best_by_auc() {
        log::info!("Best model by AUC: {} ({:.4})", best.model_id, best.auc);
    }

    Ok(HarnessReport {
        results: collector.results,
        cv,
        full_tree_leaves: full_tree.leaf_count(),
        pruned_tree_features,
        forest_importance,
        forest_oob_error: forest.oob_error(),
        roc_curves: collector.roc_curves,
    })
}
