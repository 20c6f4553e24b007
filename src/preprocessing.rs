//! Dataset preparation: label derivation and feature standardization.
//!
//! Scaling parameters are held in a `Scaler` so they can be fitted once (on
//! the training split, or on the whole table before splitting) and then
//! applied unchanged to every other split.

use statrs::statistics::Statistics;

use crate::data_handling::{Dataset, Label, RawTable};
use crate::error::{EvalError, Result};

/// Per-column standard scaler (mean / sample standard deviation).
#[derive(Clone, Debug, PartialEq)]
pub struct Scaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Scaler {
    /// Standardize every feature column of `dataset` with the fitted parameters.
    ///
    /// The dataset must share the scaler's feature schema.
    pub fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        if dataset.feature_names != self.feature_names {
            return Err(EvalError::ShapeMismatch {
                expected: self.feature_names.len(),
                found: dataset.n_features(),
            });
        }
        let x = dataset
            .x
            .map_columns(|c, v| (v - self.mean[c]) / self.std[c]);
        Dataset::with_row_ids(
            x,
            dataset.y.clone(),
            dataset.feature_names.clone(),
            dataset.row_ids().to_vec(),
        )
    }
}

/// Fit a `Scaler` over every record of `dataset`.
///
/// Fails with `DegenerateColumn` when a column is constant (zero standard
/// deviation), or when the deviation is undefined because the dataset holds a
/// single record.
pub fn fit_scaler(dataset: &Dataset) -> Result<Scaler> {
    let mut mean = Vec::with_capacity(dataset.n_features());
    let mut std = Vec::with_capacity(dataset.n_features());

    for (c, name) in dataset.feature_names.iter().enumerate() {
        let column = dataset.x.column(c);
        let m = column.iter().mean();
        let s = column.iter().std_dev();
        let constant = column.iter().all(|&v| v == column[0]);
        if constant || !s.is_finite() || s == 0.0 {
            return Err(EvalError::DegenerateColumn {
                column: name.clone(),
            });
        }
        mean.push(m);
        std.push(s);
    }

    Ok(Scaler {
        feature_names: dataset.feature_names.clone(),
        mean,
        std,
    })
}

/// Standardize each feature column to zero mean and unit standard deviation,
/// with parameters computed over `dataset` itself.
pub fn scale_features(dataset: &Dataset) -> Result<Dataset> {
    fit_scaler(dataset)?.transform(dataset)
}

/// Derive a binary label from a continuous score column.
///
/// Records with `score > threshold` become `Good`, the rest `Bad`. The score
/// column is removed from the feature schema.
pub fn binarize_label(table: &RawTable, threshold: f64, score_column: &str) -> Result<Dataset> {
    let score_idx = table.column_index(score_column)?;
    let keep: Vec<usize> = (0..table.column_names.len())
        .filter(|&c| c != score_idx)
        .collect();
    if keep.is_empty() {
        return Err(EvalError::InvalidParameter(format!(
            "table has no feature columns besides '{}'",
            score_column
        )));
    }

    let labels: Vec<Label> = table
        .columns
        .column(score_idx)
        .into_iter()
        .map(|score| Label::from_positive(score > threshold))
        .collect();

    let names = keep.iter().map(|&c| table.column_names[c].clone()).collect();
    let dataset = Dataset::new(table.columns.select_columns(&keep), labels, names)?;

    let (n_good, n_bad) = dataset.class_counts();
    log::debug!(
        "Binarized '{}' at threshold {}: {} good, {} bad",
        score_column,
        threshold,
        n_good,
        n_bad
    );
    Ok(dataset)
}
