use crate::config::{DistanceMetric, KnnParams};
use crate::data_handling::{Dataset, Label};
use crate::error::{EvalError, Result};
use crate::models::classifier_trait::{Classifier, FittedModel};

/// Lazy k-nearest-neighbours learner; fitting only checks `k` and keeps a
/// reference to the training set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KnnClassifier {
    pub params: KnnParams,
}

impl KnnClassifier {
    pub fn new(params: KnnParams) -> Self {
        Self { params }
    }

    pub fn with_k(k: usize) -> Self {
        Self::new(KnnParams {
            k,
            ..KnnParams::default()
        })
    }

    pub fn fit_knn<'a>(&self, train: &'a Dataset) -> Result<KnnModel<'a>> {
        let k = self.params.k;
        if k < 1 || k > train.len() {
            return Err(EvalError::InvalidK {
                k,
                n_train: train.len(),
            });
        }
        Ok(KnnModel {
            train,
            k,
            metric: self.params.metric,
        })
    }
}

impl Classifier for KnnClassifier {
    fn fit<'a>(&self, train: &'a Dataset) -> Result<Box<dyn FittedModel + 'a>> {
        Ok(Box::new(self.fit_knn(train)?))
    }

    fn name(&self) -> String {
        format!("knn_k{}", self.params.k)
    }
}

#[derive(Debug, Clone)]
pub struct KnnModel<'a> {
    train: &'a Dataset,
    k: usize,
    metric: DistanceMetric,
}

impl<'a> KnnModel<'a> {
    pub fn k(&self) -> usize {
        self.k
    }

    /// Training row indices of the `k` nearest records, closest first.
    /// Equal distances are ordered by training index.
    pub fn neighbours(&self, features: &[f64]) -> Vec<usize> {
        let mut dist: Vec<(f64, usize)> = self
            .train
            .x
            .rows()
            .enumerate()
            .map(|(i, row)| (distance(self.metric, row, features), i))
            .collect();
        dist.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        dist.truncate(self.k);
        dist.into_iter().map(|(_, i)| i).collect()
    }

    fn good_votes(&self, features: &[f64]) -> usize {
        self.neighbours(features)
            .into_iter()
            .filter(|&i| self.train.label(i).is_good())
            .count()
    }
}

impl<'a> FittedModel for KnnModel<'a> {
    fn predict_label(&self, features: &[f64]) -> Label {
        let good = self.good_votes(features);
        Label::majority(good, self.k - good)
    }

    fn predict_score(&self, features: &[f64]) -> f64 {
        self.good_votes(features) as f64 / self.k as f64
    }

    fn n_features(&self) -> usize {
        self.train.n_features()
    }
}

fn distance(metric: DistanceMetric, a: &[f64], b: &[f64]) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Dataset {
        Dataset::from_records(
            vec!["x".into()],
            vec![
                (vec![0.0], Label::Bad),
                (vec![1.0], Label::Bad),
                (vec![2.0], Label::Good),
                (vec![3.0], Label::Good),
                (vec![10.0], Label::Good),
            ],
        )
        .unwrap()
    }

    #[test]
    fn k_out_of_range_is_rejected() {
        let data = line();
        assert_eq!(
            KnnClassifier::with_k(0).fit_knn(&data).unwrap_err(),
            EvalError::InvalidK { k: 0, n_train: 5 }
        );
        assert!(KnnClassifier::with_k(6).fit_knn(&data).is_err());
        assert!(KnnClassifier::with_k(5).fit_knn(&data).is_ok());
    }

    #[test]
    fn equal_distances_break_on_training_index() {
        let data = line();
        let model = KnnClassifier::with_k(2).fit_knn(&data).unwrap();
        // 1.0 and 2.0 are equidistant from 1.5; both are taken, then 0.0 would be next.
        assert_eq!(model.neighbours(&[1.5]), vec![1, 2]);
        let model = KnnClassifier::with_k(1).fit_knn(&data).unwrap();
        assert_eq!(model.neighbours(&[1.5]), vec![1]);
    }

    #[test]
    fn score_is_good_fraction() {
        let data = line();
        let model = KnnClassifier::with_k(4).fit_knn(&data).unwrap();
        assert_eq!(model.predict_score(&[0.0]), 0.5);
        assert_eq!(model.predict_label(&[0.0]), Label::Good);
    }

    #[test]
    fn manhattan_metric() {
        assert_eq!(distance(DistanceMetric::Manhattan, &[0.0, 0.0], &[3.0, 4.0]), 7.0);
        assert_eq!(distance(DistanceMetric::Euclidean, &[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }
}
