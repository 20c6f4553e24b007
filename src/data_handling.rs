//! Data structures for labelled tabular data.
//!
//! `RawTable` holds numeric columns before a label has been derived;
//! `Dataset` holds the feature matrix, the binary labels and the feature-name
//! schema. Every dataset row remembers its index in the source table so that
//! splits can be compared by row identity.
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::math::Array2;

/// Binary class label. `Good` is the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Bad,
    Good,
}

impl Label {
    pub fn from_positive(positive: bool) -> Self {
        if positive {
            Label::Good
        } else {
            Label::Bad
        }
    }

    pub fn is_good(self) -> bool {
        self == Label::Good
    }

    /// Majority label for a pair of class counts. Equal counts resolve to `Good`.
    pub fn majority(n_good: usize, n_bad: usize) -> Self {
        Label::from_positive(n_good >= n_bad)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Good => write!(f, "good"),
            Label::Bad => write!(f, "bad"),
        }
    }
}

/// One observation: feature values plus label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record<'a> {
    pub features: &'a [f64],
    pub label: Label,
}

/// Numeric table before label derivation (one column holds the score).
#[derive(Debug, Clone)]
pub struct RawTable {
    pub columns: Array2<f64>,
    pub column_names: Vec<String>,
}

impl RawTable {
    pub fn new(columns: Array2<f64>, column_names: Vec<String>) -> Result<Self> {
        if columns.nrows() == 0 {
            return Err(EvalError::EmptyDataset);
        }
        if column_names.len() != columns.ncols() {
            return Err(EvalError::ShapeMismatch {
                expected: columns.ncols(),
                found: column_names.len(),
            });
        }
        check_unique(&column_names)?;
        check_finite(&columns, &column_names)?;
        Ok(Self {
            columns,
            column_names,
        })
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.column_names
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| EvalError::UnknownFeature(name.to_string()))
    }

    pub fn nrows(&self) -> usize {
        self.columns.nrows()
    }
}

/// Labelled dataset sharing one feature schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Vec<Label>,
    pub feature_names: Vec<String>,
    row_ids: Vec<usize>,
}

impl Dataset {
    pub fn new(x: Array2<f64>, y: Vec<Label>, feature_names: Vec<String>) -> Result<Self> {
        let row_ids = (0..x.nrows()).collect();
        Self::with_row_ids(x, y, feature_names, row_ids)
    }

    /// Build a dataset from owned `(features, label)` pairs.
    pub fn from_records(feature_names: Vec<String>, records: Vec<(Vec<f64>, Label)>) -> Result<Self> {
        let (rows, labels): (Vec<_>, Vec<_>) = records.into_iter().unzip();
        if rows.is_empty() {
            return Err(EvalError::EmptyDataset);
        }
        let x = Array2::from_rows(rows).map_err(|e| EvalError::InvalidParameter(e.to_string()))?;
        Self::new(x, labels, feature_names)
    }

    pub(crate) fn with_row_ids(
        x: Array2<f64>,
        y: Vec<Label>,
        feature_names: Vec<String>,
        row_ids: Vec<usize>,
    ) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(EvalError::EmptyDataset);
        }
        if y.len() != x.nrows() {
            return Err(EvalError::ShapeMismatch {
                expected: x.nrows(),
                found: y.len(),
            });
        }
        if feature_names.len() != x.ncols() {
            return Err(EvalError::ShapeMismatch {
                expected: x.ncols(),
                found: feature_names.len(),
            });
        }
        check_unique(&feature_names)?;
        check_finite(&x, &feature_names)?;
        Ok(Self {
            x,
            y,
            feature_names,
            row_ids,
        })
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    /// Always false for a constructed dataset; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn features(&self, row: usize) -> &[f64] {
        self.x.row_slice(row)
    }

    pub fn label(&self, row: usize) -> Label {
        self.y[row]
    }

    pub fn record(&self, row: usize) -> Record<'_> {
        Record {
            features: self.features(row),
            label: self.y[row],
        }
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> + '_ {
        (0..self.len()).map(move |r| self.record(r))
    }

    /// Identity of each row in the source table.
    pub fn row_ids(&self) -> &[usize] {
        &self.row_ids
    }

    pub fn class_counts(&self) -> (usize, usize) {
        let n_good = self.y.iter().filter(|l| l.is_good()).count();
        (n_good, self.y.len() - n_good)
    }

    pub fn feature_index(&self, name: &str) -> Result<usize> {
        self.feature_names
            .iter()
            .position(|f| f == name)
            .ok_or_else(|| EvalError::UnknownFeature(name.to_string()))
    }

    /// Subset of rows, preserving row identities and the schema.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Dataset> {
        if indices.is_empty() {
            return Err(EvalError::EmptyDataset);
        }
        Ok(Dataset {
            x: self.x.select_rows(indices),
            y: indices.iter().map(|&i| self.y[i]).collect(),
            feature_names: self.feature_names.clone(),
            row_ids: indices.iter().map(|&i| self.row_ids[i]).collect(),
        })
    }

    /// Remove predictors by name.
    pub fn drop_features<S: AsRef<str>>(&self, names: &[S]) -> Result<Dataset> {
        let mut dropped = HashSet::new();
        for name in names {
            dropped.insert(self.feature_index(name.as_ref())?);
        }
        let keep: Vec<usize> = (0..self.n_features()).filter(|c| !dropped.contains(c)).collect();
        if keep.is_empty() {
            return Err(EvalError::InvalidParameter(
                "cannot drop every feature column".to_string(),
            ));
        }
        log::debug!(
            "Dropping {} feature(s): {}",
            dropped.len(),
            names.iter().map(|n| n.as_ref()).collect::<Vec<_>>().join(", ")
        );
        Ok(Dataset {
            x: self.x.select_columns(&keep),
            y: self.y.clone(),
            feature_names: keep.iter().map(|&c| self.feature_names[c].clone()).collect(),
            row_ids: self.row_ids.clone(),
        })
    }

    pub fn log_summary(&self, title: &str) {
        let (n_good, n_bad) = self.class_counts();
        log::info!(
            "{}: {} records ({} good, {} bad), {} features",
            title,
            self.len(),
            n_good,
            n_bad,
            self.n_features()
        );
    }
}

/// NaN and infinite values are rejected; split thresholds and distances
/// are only defined on finite data.
fn check_finite(x: &Array2<f64>, names: &[String]) -> Result<()> {
    for (row, values) in x.rows().enumerate() {
        if let Some(col) = values.iter().position(|v| !v.is_finite()) {
            return Err(EvalError::InvalidParameter(format!(
                "non-finite value {} in column '{}' at row {}",
                values[col], names[col], row
            )));
        }
    }
    Ok(())
}

fn check_unique(names: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(EvalError::InvalidParameter(format!(
                "duplicate column name '{}'",
                name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> Dataset {
        Dataset::from_records(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                (vec![1.0, 2.0, 3.0], Label::Good),
                (vec![4.0, 5.0, 6.0], Label::Bad),
                (vec![7.0, 8.0, 9.0], Label::Good),
            ],
        )
        .unwrap()
    }

    #[test]
    fn majority_ties_resolve_to_good() {
        assert_eq!(Label::majority(2, 2), Label::Good);
        assert_eq!(Label::majority(1, 2), Label::Bad);
    }

    #[test]
    fn drop_features_by_name_keeps_schema_order() {
        let ds = toy().drop_features(&["b"]).unwrap();
        assert_eq!(ds.feature_names, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(ds.features(1), &[4.0, 6.0]);
    }

    #[test]
    fn drop_unknown_feature_errors() {
        let err = toy().drop_features(&["missing"]).unwrap_err();
        assert_eq!(err, EvalError::UnknownFeature("missing".into()));
    }

    #[test]
    fn select_rows_preserves_row_identity() {
        let ds = toy();
        let sub = ds.select_rows(&[2, 0]).unwrap();
        assert_eq!(sub.row_ids(), &[2, 0]);
        assert_eq!(sub.label(0), Label::Good);
        let subsub = sub.select_rows(&[1]).unwrap();
        assert_eq!(subsub.row_ids(), &[0]);
    }

    #[test]
    fn new_rejects_label_count_mismatch() {
        let x = Array2::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
        let err = Dataset::new(x, vec![Label::Good], vec!["a".into()]).unwrap_err();
        assert_eq!(err, EvalError::ShapeMismatch { expected: 2, found: 1 });
    }

    #[test]
    fn non_finite_values_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = Dataset::from_records(
                vec!["a".into()],
                vec![(vec![1.0], Label::Good), (vec![bad], Label::Bad)],
            )
            .unwrap_err();
            assert!(matches!(err, EvalError::InvalidParameter(ref m) if m.contains("row 1")));
        }
        let x = Array2::from_shape_vec((1, 2), vec![f64::NAN, 6.0]).unwrap();
        assert!(RawTable::new(x, vec!["a".into(), "quality".into()]).is_err());
    }

    #[test]
    fn duplicate_names_rejected() {
        let x = Array2::from_shape_vec((1, 2), vec![1.0, 2.0]).unwrap();
        assert!(Dataset::new(x, vec![Label::Bad], vec!["a".into(), "a".into()]).is_err());
    }
}
