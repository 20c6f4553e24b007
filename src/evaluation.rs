//! Uniform scoring of fitted models on a held-out split.
use serde::{Deserialize, Serialize};

use crate::data_handling::{Dataset, Label};
use crate::error::{EvalError, Result};
use crate::models::classifier_trait::{Classifier, FittedModel};
use crate::stats::{roc_curve, RocCurve};

/// Two-by-two contingency table indexed by `[predicted][true]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: [[usize; 2]; 2],
}

fn slot(label: Label) -> usize {
    match label {
        Label::Bad => 0,
        Label::Good => 1,
    }
}

impl ConfusionMatrix {
    pub fn from_labels(predicted: &[Label], truth: &[Label]) -> Result<Self> {
        if predicted.len() != truth.len() {
            return Err(EvalError::ShapeMismatch {
                expected: truth.len(),
                found: predicted.len(),
            });
        }
        let mut counts = [[0; 2]; 2];
        for (&p, &t) in predicted.iter().zip(truth) {
            counts[slot(p)][slot(t)] += 1;
        }
        Ok(Self { counts })
    }

    pub fn get(&self, predicted: Label, truth: Label) -> usize {
        self.counts[slot(predicted)][slot(truth)]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Correct predictions.
    pub fn trace(&self) -> usize {
        self.counts[0][0] + self.counts[1][1]
    }

    pub fn accuracy(&self) -> f64 {
        self.trace() as f64 / self.total() as f64
    }

    pub fn error_rate(&self) -> f64 {
        1.0 - self.accuracy()
    }

    /// Recall of `Good`.
    pub fn sensitivity(&self) -> f64 {
        ratio(
            self.get(Label::Good, Label::Good),
            self.get(Label::Good, Label::Good) + self.get(Label::Bad, Label::Good),
        )
    }

    /// Recall of `Bad`.
    pub fn specificity(&self) -> f64 {
        ratio(
            self.get(Label::Bad, Label::Bad),
            self.get(Label::Bad, Label::Bad) + self.get(Label::Good, Label::Bad),
        )
    }

    pub fn precision(&self) -> f64 {
        ratio(
            self.get(Label::Good, Label::Good),
            self.get(Label::Good, Label::Good) + self.get(Label::Good, Label::Bad),
        )
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        f64::NAN
    } else {
        num as f64 / den as f64
    }
}

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub model_id: String,
    pub accuracy: f64,
    pub error_rate: f64,
    pub auc: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub record: EvaluationRecord,
    pub confusion: ConfusionMatrix,
    pub roc: RocCurve,
}

/// Score `model` on every record of `test`, keyed by `classifier`'s name.
pub fn evaluate(
    classifier: &dyn Classifier,
    model: &dyn FittedModel,
    test: &Dataset,
) -> Result<EvaluationRecord> {
    Ok(evaluate_detailed(classifier, model, test)?.record)
}

/// As `evaluate`, keeping the confusion matrix and ROC curve.
pub fn evaluate_detailed(
    classifier: &dyn Classifier,
    model: &dyn FittedModel,
    test: &Dataset,
) -> Result<Evaluation> {
    if model.n_features() != test.n_features() {
        return Err(EvalError::ShapeMismatch {
            expected: model.n_features(),
            found: test.n_features(),
        });
    }

    let (predicted, scores): (Vec<Label>, Vec<f64>) = test
        .records()
        .map(|r| (model.predict_label(r.features), model.predict_score(r.features)))
        .unzip();

    let confusion = ConfusionMatrix::from_labels(&predicted, &test.y)?;
    let roc = roc_curve(&scores, &test.y)?;
    let record = EvaluationRecord {
        model_id: classifier.name(),
        accuracy: confusion.accuracy(),
        error_rate: confusion.error_rate(),
        auc: roc.auc,
    };
    log::info!(
        "{}: accuracy {:.4}, error rate {:.4}, AUC {:.4} on {} test records",
        record.model_id,
        record.accuracy,
        record.error_rate,
        record.auc,
        test.len()
    );
    Ok(Evaluation {
        record,
        confusion,
        roc,
    })
}

/// Append-only collection of evaluation records, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    records: Vec<EvaluationRecord>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EvaluationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, model_id: &str) -> Option<&EvaluationRecord> {
        self.records.iter().find(|r| r.model_id == model_id)
    }

    pub fn best_by_auc(&self) -> Option<&EvaluationRecord> {
        self.records.iter().max_by(|a, b| a.auc.total_cmp(&b.auc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Label::{Bad, Good};

    #[test]
    fn confusion_matrix_rates() {
        let predicted = [Good, Good, Bad, Bad, Good];
        let truth = [Good, Bad, Bad, Good, Good];
        let cm = ConfusionMatrix::from_labels(&predicted, &truth).unwrap();
        assert_eq!(cm.total(), 5);
        assert_eq!(cm.trace(), 3);
        assert_eq!(cm.get(Good, Bad), 1);
        assert!((cm.accuracy() - 0.6).abs() < 1e-12);
        assert!((cm.error_rate() - 0.4).abs() < 1e-12);
        assert!((cm.sensitivity() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.specificity() - 0.5).abs() < 1e-12);
        assert!((cm.precision() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn results_table_keeps_order() {
        let mut table = ResultsTable::new();
        for (id, auc) in [("a", 0.7), ("b", 0.9), ("c", 0.8)] {
            table.push(EvaluationRecord {
                model_id: id.to_string(),
                accuracy: 0.0,
                error_rate: 1.0,
                auc,
            });
        }
        let ids: Vec<&str> = table.records().iter().map(|r| r.model_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(table.best_by_auc().unwrap().model_id, "b");
        assert!(table.get("z").is_none());
    }
}
