//! In-memory tabular estimators and the normalized model bundle
//!
//! Every artifact, whatever its on-disk shape, is turned into a [`ModelBundle`]
//! at load time: one estimator, an optional feature schema, and the capability
//! set resolved from the estimator kind.

mod linear;
mod tree;

#[cfg(test)]
pub(crate) mod fixtures;

pub use linear::LinearModel;
pub use tree::{Node, Objective, Tree, TreeEnsemble};

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EstimateError;
use crate::loader::ArtifactFormat;

/// What an estimator can do beyond plain prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Capability {
    /// Only `predict`
    Predictor,
    /// `predict` and `predict_proba` over a fixed number of classes
    ProbabilisticPredictor { n_classes: usize },
}

impl Capability {
    pub fn has_proba(&self) -> bool {
        matches!(self, Capability::ProbabilisticPredictor { .. })
    }
}

/// A single native prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Label {
    /// Class label of a classifier
    Class(String),
    /// Output of a regressor
    Value(f64),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Class(c) => f.write_str(c),
            // Integral outputs keep their decimal point: 2.0, not 2
            Label::Value(v) => write!(f, "{:?}", v),
        }
    }
}

/// Supported estimator kinds, tagged by `kind` in artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    GradientBoosting(TreeEnsemble),
    LogisticRegression(LinearModel),
    LinearRegression(LinearModel),
}

impl Estimator {
    /// Short name for logs and listings
    pub fn kind_name(&self) -> &'static str {
        match self {
            Estimator::GradientBoosting(_) => "gradient_boosting",
            Estimator::LogisticRegression(_) => "logistic_regression",
            Estimator::LinearRegression(_) => "linear_regression",
        }
    }

    /// Number of input columns the estimator consumes
    pub fn num_features(&self) -> usize {
        match self {
            Estimator::GradientBoosting(m) => m.num_features,
            Estimator::LogisticRegression(m) | Estimator::LinearRegression(m) => m.num_features(),
        }
    }

    /// Feature names recorded on the estimator itself, if any
    pub fn native_feature_names(&self) -> Option<&[String]> {
        match self {
            Estimator::GradientBoosting(m) => m.feature_name.as_deref(),
            Estimator::LogisticRegression(m) | Estimator::LinearRegression(m) => {
                m.feature_name.as_deref()
            }
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Estimator::GradientBoosting(m) => match m.objective.num_classes() {
                Some(n_classes) => Capability::ProbabilisticPredictor { n_classes },
                None => Capability::Predictor,
            },
            Estimator::LogisticRegression(m) => Capability::ProbabilisticPredictor {
                n_classes: m.num_classes(),
            },
            Estimator::LinearRegression(_) => Capability::Predictor,
        }
    }

    /// Structural checks run once at load time
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Estimator::GradientBoosting(m) => m.validate(),
            Estimator::LogisticRegression(m) => m.validate(true),
            Estimator::LinearRegression(m) => m.validate(false),
        }
    }

    pub fn predict(&self, row: &[f64]) -> Result<Label, EstimateError> {
        match self {
            Estimator::GradientBoosting(m) => m.predict(row),
            Estimator::LogisticRegression(m) => m.predict_class(row),
            Estimator::LinearRegression(m) => m.predict_value(row).map(Label::Value),
        }
    }

    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, EstimateError> {
        match self {
            Estimator::GradientBoosting(m) => m.predict_proba(row),
            Estimator::LogisticRegression(m) => m.predict_proba(row),
            Estimator::LinearRegression(_) => Err(EstimateError::Unsupported("predict_proba")),
        }
    }
}

/// Normalized in-memory model: estimator plus expected feature schema
#[derive(Debug, Clone)]
pub struct ModelBundle {
    estimator: Estimator,
    feature_names: Option<Vec<String>>,
    capability: Capability,
    format: ArtifactFormat,
    source: PathBuf,
}

impl ModelBundle {
    /// Validate the estimator and resolve its capability set
    pub fn new(
        estimator: Estimator,
        feature_names: Option<Vec<String>>,
        format: ArtifactFormat,
    ) -> Result<Self, String> {
        estimator.validate()?;

        if let Some(ref names) = feature_names {
            if names.len() != estimator.num_features() {
                return Err(format!(
                    "{} feature names declared for an estimator with {} inputs",
                    names.len(),
                    estimator.num_features()
                ));
            }
        }

        let capability = estimator.capability();
        Ok(Self {
            estimator,
            feature_names,
            capability,
            format,
            source: PathBuf::new(),
        })
    }

    /// Bundle that skips validation, for exercising corrupt estimators
    #[cfg(test)]
    pub(crate) fn unchecked(estimator: Estimator) -> Self {
        let capability = estimator.capability();
        Self {
            estimator,
            feature_names: None,
            capability,
            format: ArtifactFormat::Native,
            source: PathBuf::new(),
        }
    }

    /// Record the artifact path the bundle was loaded from
    pub fn with_source<P: Into<PathBuf>>(mut self, source: P) -> Self {
        self.source = source.into();
        self
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }

    /// Artifact path, empty for bundles built in memory
    pub fn source(&self) -> &Path {
        &self.source
    }
}

pub(crate) fn check_width(expected: usize, row: &[f64]) -> Result<(), EstimateError> {
    if row.len() != expected {
        return Err(EstimateError::ShapeMismatch {
            expected,
            got: row.len(),
        });
    }
    Ok(())
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax
pub(crate) fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins on ties
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

pub(crate) fn class_label(classes: Option<&[String]>, index: usize) -> Label {
    match classes.and_then(|c| c.get(index)) {
        Some(name) => Label::Class(name.clone()),
        None => Label::Class(index.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_resolved_from_kind() {
        assert_eq!(
            fixtures::binary_gbdt().capability(),
            Capability::ProbabilisticPredictor { n_classes: 2 }
        );
        assert_eq!(
            fixtures::multiclass_logistic().capability(),
            Capability::ProbabilisticPredictor { n_classes: 3 }
        );
        assert_eq!(
            fixtures::linear_regressor().capability(),
            Capability::Predictor
        );
        assert_eq!(
            fixtures::regression_gbdt().capability(),
            Capability::Predictor
        );
    }

    #[test]
    fn test_bundle_rejects_feature_count_mismatch() {
        let err = ModelBundle::new(
            fixtures::binary_gbdt(),
            Some(vec!["a".into(), "b".into()]),
            ArtifactFormat::Native,
        )
        .unwrap_err();
        assert!(err.contains("2 feature names"));
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::Class("CONFIRMED".into()).to_string(), "CONFIRMED");
        assert_eq!(Label::Value(2.5).to_string(), "2.5");
        assert_eq!(Label::Value(2.0).to_string(), "2.0");
        assert_eq!(Label::Value(-3.0).to_string(), "-3.0");
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(argmax(&p), 2);
    }

    #[test]
    fn test_estimator_kind_tag_roundtrip() {
        let json = serde_json::to_value(fixtures::linear_regressor()).unwrap();
        assert_eq!(json["kind"], "linear_regression");
        let back: Estimator = serde_json::from_value(json).unwrap();
        assert_eq!(back, fixtures::linear_regressor());
    }
}
