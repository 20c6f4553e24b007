//! Integration tests for the evaluator, ROC AUC and results output.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use quality_classifiers::data_handling::{Dataset, Label};
use quality_classifiers::error::EvalError;
use quality_classifiers::evaluation::{evaluate, evaluate_detailed, EvaluationRecord, ResultsTable};
use quality_classifiers::io::write_results;
use quality_classifiers::models::classifier_trait::Classifier;
use quality_classifiers::models::knn::KnnClassifier;
use quality_classifiers::stats::roc_auc;

#[test]
fn auc_is_near_half_for_noise() {
    let mut rng = StdRng::seed_from_u64(2024);
    let scores: Vec<f64> = (0..2000).map(|_| rng.gen()).collect();
    let labels: Vec<Label> = (0..2000).map(|_| Label::from_positive(rng.gen_bool(0.5))).collect();
    let auc = roc_auc(&scores, &labels).unwrap();
    assert!((0.0..=1.0).contains(&auc));
    assert!((auc - 0.5).abs() < 0.05, "auc = {}", auc);
}

#[test]
fn auc_is_one_for_a_perfect_separator() {
    let labels: Vec<Label> = (0..50).map(|i| Label::from_positive(i >= 20)).collect();
    let scores: Vec<f64> = (0..50).map(|i| i as f64 / 50.0).collect();
    assert_eq!(roc_auc(&scores, &labels).unwrap(), 1.0);
}

#[test]
fn auc_single_class_is_an_error() {
    let err = roc_auc(&[0.2, 0.4, 0.9], &[Label::Bad; 3]).unwrap_err();
    assert_eq!(err, EvalError::DegenerateLabels { label: Label::Bad });
}

#[test]
fn evaluate_rejects_schema_mismatch() {
    let train = Dataset::from_records(
        vec!["a".into()],
        vec![(vec![0.0], Label::Good), (vec![1.0], Label::Bad)],
    )
    .unwrap();
    let test = Dataset::from_records(
        vec!["a".into(), "b".into()],
        vec![(vec![0.0, 1.0], Label::Good), (vec![1.0, 0.0], Label::Bad)],
    )
    .unwrap();
    let clf = KnnClassifier::with_k(1);
    let model = clf.fit(&train).unwrap();
    assert_eq!(
        evaluate(&clf, model.as_ref(), &test).unwrap_err(),
        EvalError::ShapeMismatch {
            expected: 1,
            found: 2
        }
    );
}

#[test]
fn detailed_evaluation_is_consistent() {
    let rows: Vec<(Vec<f64>, Label)> = (0..40)
        .map(|i| {
            let x = i as f64;
            // Labels flip every five records, so a 1-NN makes mistakes near boundaries.
            (vec![x], Label::from_positive((i / 5) % 2 == 0))
        })
        .collect();
    let train = Dataset::from_records(vec!["x".into()], rows.iter().step_by(2).cloned().collect()).unwrap();
    let test = Dataset::from_records(vec!["x".into()], rows.iter().skip(1).step_by(2).cloned().collect()).unwrap();

    let clf = KnnClassifier::with_k(3);
    let model = clf.fit(&train).unwrap();
    let eval = evaluate_detailed(&clf, model.as_ref(), &test).unwrap();
    assert_eq!(eval.record.model_id, "knn_k3");
    assert_eq!(eval.confusion.total(), test.len());
    assert!((eval.record.accuracy + eval.record.error_rate - 1.0).abs() < 1e-12);
    assert_eq!(
        eval.record.accuracy,
        eval.confusion.trace() as f64 / test.len() as f64
    );
    assert_eq!(eval.roc.auc, eval.record.auc);
    let first = eval.roc.points.first().unwrap();
    let last = eval.roc.points.last().unwrap();
    assert_eq!((first.fpr, first.tpr), (0.0, 0.0));
    assert_eq!((last.fpr, last.tpr), (1.0, 1.0));
}

#[test]
fn results_file_uses_extension_delimiter() {
    let mut table = ResultsTable::new();
    table.push(EvaluationRecord {
        model_id: "random_forest_500".into(),
        accuracy: 0.875,
        error_rate: 0.125,
        auc: 0.9,
    });
    let path = std::env::temp_dir().join(format!("quality_results_{}.tsv", std::process::id()));
    write_results(&table, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(
        text,
        "model_id\taccuracy\terror_rate\tauc\nrandom_forest_500\t0.875\t0.125\t0.9\n"
    );
}
