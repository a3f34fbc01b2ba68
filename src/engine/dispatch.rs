//! Prediction dispatch
//!
//! Invokes the capabilities resolved on a bundle and normalizes the output.
//! The single-row path coerces the prediction to a string; the multi-row path
//! keeps native labels.

use serde::Serialize;

use crate::error::{EstimateError, LoadError, ServeError};
use crate::model::{Capability, Label, ModelBundle};

/// Transport-neutral result of one prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub prediction: String,
    /// One probability per class, absent for non-probabilistic models
    pub probabilities: Option<Vec<f64>>,
}

/// Predict a single aligned row
pub fn predict_one(bundle: &ModelBundle, row: &[f64]) -> Result<PredictionResult, ServeError> {
    let estimator = bundle.estimator();
    let label = estimator
        .predict(row)
        .map_err(|e| classify(bundle, e))?;

    let probabilities = match bundle.capability() {
        Capability::ProbabilisticPredictor { n_classes } => {
            let proba = estimator
                .predict_proba(row)
                .map_err(|e| classify(bundle, e))?;
            usable_probabilities(proba, n_classes)
        }
        Capability::Predictor => None,
    };

    Ok(PredictionResult {
        prediction: label.to_string(),
        probabilities,
    })
}

/// Predict many rows, keeping native labels
pub fn predict_rows<R: AsRef<[f64]>>(
    bundle: &ModelBundle,
    rows: &[R],
) -> Result<Vec<Label>, ServeError> {
    let estimator = bundle.estimator();
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            estimator.predict(row.as_ref()).map_err(|e| match classify(bundle, e) {
                ServeError::Prediction(msg) => ServeError::Prediction(format!("row {}: {}", i, msg)),
                other => other,
            })
        })
        .collect()
}

/// Input problems are the caller's; defects belong to the artifact
fn classify(bundle: &ModelBundle, err: EstimateError) -> ServeError {
    match err {
        EstimateError::Defect(msg) => ServeError::ModelLoad {
            path: bundle.source().to_path_buf(),
            source: LoadError::Invalid(msg),
        },
        other => ServeError::Prediction(other.to_string()),
    }
}

/// Drop probability vectors that do not describe a distribution over the classes
fn usable_probabilities(proba: Vec<f64>, n_classes: usize) -> Option<Vec<f64>> {
    if proba.len() != n_classes {
        tracing::warn!(
            expected = n_classes,
            got = proba.len(),
            "Ignoring probability output with unexpected shape"
        );
        return None;
    }
    if proba.iter().any(|p| !p.is_finite() || !(0.0..=1.0).contains(p)) {
        tracing::warn!(?proba, "Ignoring probability output outside [0, 1]");
        return None;
    }
    Some(proba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ArtifactFormat;
    use crate::model::{fixtures, Estimator, Node, Objective, Tree, TreeEnsemble};

    fn bundle(estimator: Estimator) -> ModelBundle {
        ModelBundle::new(estimator, None, ArtifactFormat::Native).unwrap()
    }

    #[test]
    fn test_classifier_returns_probabilities() {
        let result = predict_one(&bundle(fixtures::binary_gbdt()), &[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(result.prediction, "CONFIRMED");
        let proba = result.probabilities.unwrap();
        assert_eq!(proba.len(), 2);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_multiclass_probability_length_matches_classes() {
        let result = predict_one(&bundle(fixtures::multiclass_logistic()), &[0.0, 3.0]).unwrap();
        assert_eq!(result.prediction, "mid");
        assert_eq!(result.probabilities.unwrap().len(), 3);
    }

    #[test]
    fn test_regressor_has_no_probabilities() {
        let result = predict_one(&bundle(fixtures::linear_regressor()), &[1.0, 1.0]).unwrap();
        assert_eq!(result.prediction, "1.5");
        assert!(result.probabilities.is_none());
    }

    #[test]
    fn test_integral_regression_output_keeps_decimal_point() {
        let result = predict_one(&bundle(fixtures::linear_regressor()), &[1.0, 0.5]).unwrap();
        assert_eq!(result.prediction, "2.0");
    }

    #[test]
    fn test_shape_mismatch_is_prediction_error() {
        let err = predict_one(&bundle(fixtures::binary_gbdt()), &[1.0]).unwrap_err();
        assert!(matches!(err, ServeError::Prediction(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_defect_is_load_error() {
        let estimator = Estimator::GradientBoosting(TreeEnsemble {
            objective: Objective::Regression,
            num_features: 1,
            base_score: Vec::new(),
            trees: vec![Tree {
                nodes: vec![Node::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 5,
                    right: 6,
                    default_left: true,
                }],
            }],
            classes: None,
            feature_name: None,
        });
        let corrupt = ModelBundle::unchecked(estimator).with_source("models/latest/broken.json");

        match predict_one(&corrupt, &[0.0]).unwrap_err() {
            ServeError::ModelLoad { path, .. } => {
                assert_eq!(path, std::path::PathBuf::from("models/latest/broken.json"))
            }
            other => panic!("expected load error, got {:?}", other),
        }
    }

    #[test]
    fn test_predict_rows_keeps_native_labels() {
        let b = bundle(fixtures::regression_gbdt());
        let labels = predict_rows(&b, &[vec![1.0], vec![3.0]]).unwrap();
        assert_eq!(labels, vec![Label::Value(0.5), Label::Value(1.5)]);

        let err = predict_rows(&b, &[vec![1.0], vec![1.0, 2.0]]).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_irregular_probabilities_are_omitted() {
        assert_eq!(usable_probabilities(vec![0.2, 0.8], 3), None);
        assert_eq!(usable_probabilities(vec![1.2, -0.2], 2), None);
        assert_eq!(usable_probabilities(vec![f64::NAN, 0.5], 2), None);
        assert_eq!(usable_probabilities(vec![0.25, 0.75], 2), Some(vec![0.25, 0.75]));
    }
}
