use serde::{Deserialize, Serialize};

use crate::data_handling::Label;
use crate::error::{EvalError, Result};

/// One operating point: records scoring at or above `threshold` are called `Good`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub threshold: f64,
    pub fpr: f64,
    pub tpr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    /// Starts at (0, 0) and ends at (1, 1).
    pub points: Vec<RocPoint>,
    pub auc: f64,
}

/// Receiver operating characteristic of `scores` against `labels`, `Good`
/// being the positive class.
///
/// Records are visited by descending score; tied scores enter the curve
/// together as a single point, and the area is integrated with the
/// trapezoid rule.
pub fn roc_curve(scores: &[f64], labels: &[Label]) -> Result<RocCurve> {
    if scores.is_empty() {
        return Err(EvalError::EmptyDataset);
    }
    if scores.len() != labels.len() {
        return Err(EvalError::ShapeMismatch {
            expected: labels.len(),
            found: scores.len(),
        });
    }
    if let Some(i) = scores.iter().position(|s| s.is_nan()) {
        return Err(EvalError::InvalidParameter(format!(
            "score at position {} is NaN",
            i
        )));
    }
    let n_pos = labels.iter().filter(|l| l.is_good()).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 {
        return Err(EvalError::DegenerateLabels { label: Label::Bad });
    }
    if n_neg == 0 {
        return Err(EvalError::DegenerateLabels { label: Label::Good });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = vec![RocPoint {
        threshold: f64::INFINITY,
        fpr: 0.0,
        tpr: 0.0,
    }];
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut auc = 0.0;

    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if labels[order[i]].is_good() {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let prev = points[points.len() - 1];
        let point = RocPoint {
            threshold,
            fpr: fp as f64 / n_neg as f64,
            tpr: tp as f64 / n_pos as f64,
        };
        auc += (point.fpr - prev.fpr) * (point.tpr + prev.tpr) / 2.0;
        points.push(point);
    }

    Ok(RocCurve { points, auc })
}

/// Area under the ROC curve. Values below 0.5 mean the scores rank `Bad`
/// above `Good`.
pub fn roc_auc(scores: &[f64], labels: &[Label]) -> Result<f64> {
    Ok(roc_curve(scores, labels)?.auc)
}
