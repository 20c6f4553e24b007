use crate::config::ModelType;
use crate::models::classifier_trait::Classifier;
use crate::models::forest::RandomForestClassifier;
use crate::models::knn::KnnClassifier;
use crate::models::tree::DecisionTreeClassifier;

/// Build a boxed classifier from a `ModelType`.
pub fn build_model(model_type: &ModelType) -> Box<dyn Classifier> {
    match model_type {
        ModelType::DecisionTree(params) => Box::new(DecisionTreeClassifier::new(params.clone())),
        ModelType::Knn(params) => Box::new(KnnClassifier::new(params.clone())),
        ModelType::RandomForest(params) => Box::new(RandomForestClassifier::new(params.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_model_type() {
        let names: Vec<String> = ["tree", "knn", "forest"]
            .iter()
            .map(|s| build_model(&s.parse().unwrap()).name())
            .collect();
        assert_eq!(names, vec!["decision_tree", "knn_k10", "random_forest_500"]);
    }
}
