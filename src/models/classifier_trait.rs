use crate::data_handling::{Dataset, Label};
use crate::error::Result;

/// A trained model. Produced by `Classifier::fit` and only valid for the
/// feature schema it was trained on.
pub trait FittedModel {
    /// Predicted class for one feature vector.
    fn predict_label(&self, features: &[f64]) -> Label;

    /// Estimated probability of `Label::Good`, in `[0, 1]`.
    fn predict_score(&self, features: &[f64]) -> f64;

    /// Number of feature values expected per query.
    fn n_features(&self) -> usize;
}

/// Uniform contract over the model families evaluated by the harness.
///
/// The returned model may borrow the training set (k-NN is a lazy learner),
/// hence the lifetime tying it to `train`.
pub trait Classifier: Send + Sync {
    fn fit<'a>(&self, train: &'a Dataset) -> Result<Box<dyn FittedModel + 'a>>;

    /// Identifier used as the row key in the results table.
    fn name(&self) -> String;
}
