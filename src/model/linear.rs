//! Linear and logistic regression
//!
//! `coef` holds one row per output. A logistic model with a single row is a
//! binary classifier scored through the sigmoid; more rows are scored through
//! softmax.

use serde::{Deserialize, Serialize};

use super::{argmax, check_width, class_label, sigmoid, softmax, Label};
use crate::error::EstimateError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<Vec<String>>,
}

impl LinearModel {
    pub fn num_features(&self) -> usize {
        self.coef.first().map_or(0, Vec::len)
    }

    /// Class count when used as a logistic model
    pub fn num_classes(&self) -> usize {
        if self.coef.len() == 1 {
            2
        } else {
            self.coef.len()
        }
    }

    pub fn validate(&self, logistic: bool) -> Result<(), String> {
        let width = self.num_features();
        if self.coef.iter().any(|row| row.len() != width) {
            return Err("coefficient rows have different widths".to_string());
        }
        if self.intercept.len() != self.coef.len() {
            return Err(format!(
                "{} intercepts for {} coefficient rows",
                self.intercept.len(),
                self.coef.len()
            ));
        }
        if !logistic && self.coef.len() > 1 {
            return Err("linear regression supports a single output".to_string());
        }
        if let Some(ref classes) = self.classes {
            if !logistic {
                return Err("linear regression cannot declare classes".to_string());
            }
            if classes.len() != self.num_classes() {
                return Err(format!(
                    "{} class labels for {} classes",
                    classes.len(),
                    self.num_classes()
                ));
            }
        }
        if let Some(ref names) = self.feature_name {
            if names.len() != width {
                return Err(format!(
                    "feature_name lists {} names for {} inputs",
                    names.len(),
                    width
                ));
            }
        }
        Ok(())
    }

    fn decision(&self, row: &[f64]) -> Result<Vec<f64>, EstimateError> {
        if self.coef.is_empty() {
            return Err(EstimateError::NotFitted);
        }
        check_width(self.num_features(), row)?;

        Ok(self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| w.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect())
    }

    pub fn predict_value(&self, row: &[f64]) -> Result<f64, EstimateError> {
        Ok(self.decision(row)?[0])
    }

    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, EstimateError> {
        let scores = self.decision(row)?;
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            Ok(vec![1.0 - p, p])
        } else {
            Ok(softmax(&scores))
        }
    }

    pub fn predict_class(&self, row: &[f64]) -> Result<Label, EstimateError> {
        let proba = self.predict_proba(row)?;
        Ok(class_label(self.classes.as_deref(), argmax(&proba)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{fixtures, Estimator};

    fn linear(estimator: Estimator) -> LinearModel {
        match estimator {
            Estimator::LogisticRegression(m) | Estimator::LinearRegression(m) => m,
            other => panic!("unexpected estimator {:?}", other),
        }
    }

    #[test]
    fn test_linear_regression_value() {
        let m = linear(fixtures::linear_regressor());
        assert_eq!(m.predict_value(&[1.0, 1.0]).unwrap(), 1.5);
    }

    #[test]
    fn test_binary_logistic() {
        let m = linear(fixtures::binary_logistic());
        let p = m.predict_proba(&[1.0, 1.0]).unwrap();
        assert!((p[1] - sigmoid(1.0)).abs() < 1e-12);
        assert_eq!(m.predict_class(&[1.0, 1.0]).unwrap(), Label::Class("1".into()));
        assert_eq!(m.predict_class(&[0.0, 0.0]).unwrap(), Label::Class("0".into()));
    }

    #[test]
    fn test_multinomial_logistic() {
        let m = linear(fixtures::multiclass_logistic());
        let p = m.predict_proba(&[0.0, 3.0]).unwrap();
        assert_eq!(p.len(), 3);
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(
            m.predict_class(&[0.0, 3.0]).unwrap(),
            Label::Class("mid".into())
        );
    }

    #[test]
    fn test_shape_checks() {
        let m = linear(fixtures::linear_regressor());
        assert_eq!(
            m.predict_value(&[1.0, 2.0, 3.0]).unwrap_err(),
            EstimateError::ShapeMismatch {
                expected: 2,
                got: 3
            }
        );
        let unfitted = LinearModel {
            coef: Vec::new(),
            intercept: Vec::new(),
            classes: None,
            feature_name: None,
        };
        assert_eq!(
            unfitted.predict_value(&[]).unwrap_err(),
            EstimateError::NotFitted
        );
    }

    #[test]
    fn test_validate_shapes() {
        let mut m = linear(fixtures::multiclass_logistic());
        assert!(m.validate(true).is_ok());
        assert!(m.validate(false).is_err());
        m.intercept.pop();
        assert!(m.validate(true).unwrap_err().contains("intercepts"));
    }
}
