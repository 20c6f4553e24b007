//! quality-classifiers: a small harness for comparing binary classifiers on
//! tabular quality data.
//!
//! A continuous score column is thresholded into `Good` / `Bad` labels, the
//! remaining predictors are standardized, and a decision tree (full and
//! cross-validation pruned), k-nearest-neighbours and a random forest are fit
//! on one seeded train/test split and scored by accuracy, error rate and ROC
//! AUC through a single evaluator.
//!
//! Every random draw is seeded, so a run is reproducible from its
//! `HarnessConfig` alone.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod evaluation;
pub mod harness;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod preprocessing;
pub mod split;
pub mod stats;
