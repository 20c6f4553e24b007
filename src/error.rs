use std::error::Error;
use std::fmt;

use crate::data_handling::Label;

/// Errors raised by dataset preparation, splitting, model fitting and evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A feature column has zero (or undefined) standard deviation and cannot be scaled.
    DegenerateColumn { column: String },
    /// A split asked for at least as many test records as the dataset holds.
    InsufficientData { requested: usize, available: usize },
    /// k-NN neighbour count outside `1..=n_train`.
    InvalidK { k: usize, n_train: usize },
    /// Pruning target outside `1..=leaf_count`.
    InvalidTargetSize { target: usize, leaves: usize },
    /// AUC requested on data holding only one class.
    DegenerateLabels { label: Label },
    UnknownFeature(String),
    ShapeMismatch { expected: usize, found: usize },
    EmptyDataset,
    InvalidParameter(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EvalError::DegenerateColumn { column } => {
                write!(f, "Column '{}' has zero standard deviation and cannot be scaled", column)
            }
            EvalError::InsufficientData { requested, available } => write!(
                f,
                "Requested {} test records but the dataset only holds {}",
                requested, available
            ),
            EvalError::InvalidK { k, n_train } => write!(
                f,
                "k = {} is invalid for a training set of {} records (expected 1..={})",
                k, n_train, n_train
            ),
            EvalError::InvalidTargetSize { target, leaves } => write!(
                f,
                "Cannot prune a tree with {} leaves to {} leaves",
                leaves, target
            ),
            EvalError::DegenerateLabels { label } => write!(
                f,
                "AUC is undefined: every record is labelled '{}'",
                label
            ),
            EvalError::UnknownFeature(name) => write!(f, "Unknown feature column '{}'", name),
            EvalError::ShapeMismatch { expected, found } => write!(
                f,
                "Expected {} feature values per record, found {}",
                expected, found
            ),
            EvalError::EmptyDataset => write!(f, "Dataset must contain at least one record"),
            EvalError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl Error for EvalError {}

pub type Result<T> = std::result::Result<T, EvalError>;
