//! Gradient boosted decision tree ensembles
//!
//! Trees are stored as flat node vectors with the root at index 0. Splits send
//! a row left when `x <= threshold`; missing values (`NaN`) follow
//! `default_left`. For multiclass objectives tree `i` contributes to class
//! `i % num_class`.

use serde::{Deserialize, Serialize};

use super::{argmax, check_width, class_label, sigmoid, softmax, Label};
use crate::error::EstimateError;

/// Training objective, which decides how raw scores become predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Objective {
    Regression,
    Binary,
    Multiclass { num_class: usize },
}

impl Objective {
    /// Raw scores produced per row
    pub fn num_outputs(&self) -> usize {
        match self {
            Objective::Multiclass { num_class } => *num_class,
            _ => 1,
        }
    }

    /// Number of classes, `None` for regression
    pub fn num_classes(&self) -> Option<usize> {
        match self {
            Objective::Regression => None,
            Objective::Binary => Some(2),
            Objective::Multiclass { num_class } => Some(*num_class),
        }
    }
}

/// Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default)]
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

/// Single regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Tree with a single leaf
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    fn validate(&self, num_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= num_features {
                    return Err(format!(
                        "node {} splits on feature {} but the model has {} inputs",
                        idx, feature, num_features
                    ));
                }
                // Children always follow their parent, which also rules out cycles
                for child in [*left, *right] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(format!("node {} has invalid child {}", idx, child));
                    }
                }
            }
        }

        Ok(())
    }

    /// Walk the tree for one row and return the leaf value
    pub fn eval(&self, row: &[f64]) -> Result<f64, EstimateError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return Ok(*value),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                }) => {
                    let x = row.get(*feature).copied().ok_or_else(|| {
                        EstimateError::Defect(format!("split on missing feature {}", feature))
                    })?;
                    let go_left = if x.is_nan() {
                        *default_left
                    } else {
                        x <= *threshold
                    };
                    let next = if go_left { *left } else { *right };
                    if next <= idx {
                        return Err(EstimateError::Defect(format!(
                            "node {} points back to {}",
                            idx, next
                        )));
                    }
                    idx = next;
                }
                None => {
                    return Err(EstimateError::Defect(format!(
                        "node index {} out of range",
                        idx
                    )))
                }
            }
        }
    }
}

/// Additive ensemble of regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub objective: Objective,
    pub num_features: usize,
    /// Initial raw score per output; empty means zero
    #[serde(default)]
    pub base_score: Vec<f64>,
    pub trees: Vec<Tree>,
    /// Class labels, indexed by class id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<Vec<String>>,
}

impl TreeEnsemble {
    pub fn validate(&self) -> Result<(), String> {
        if let Objective::Multiclass { num_class } = self.objective {
            if num_class < 2 {
                return Err(format!(
                    "multiclass objective needs at least 2 classes, got {}",
                    num_class
                ));
            }
        }
        let outputs = self.objective.num_outputs();
        if !self.base_score.is_empty() && self.base_score.len() != outputs {
            return Err(format!(
                "base_score has {} entries, objective produces {} outputs",
                self.base_score.len(),
                outputs
            ));
        }
        if let (Some(classes), Some(n)) = (&self.classes, self.objective.num_classes()) {
            if classes.len() != n {
                return Err(format!("{} class labels for {} classes", classes.len(), n));
            }
        }
        if let Some(ref names) = self.feature_name {
            if names.len() != self.num_features {
                return Err(format!(
                    "feature_name lists {} names for {} inputs",
                    names.len(),
                    self.num_features
                ));
            }
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.num_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Sum of tree outputs per objective output, before any link function
    pub fn raw_scores(&self, row: &[f64]) -> Result<Vec<f64>, EstimateError> {
        if self.trees.is_empty() {
            return Err(EstimateError::NotFitted);
        }
        check_width(self.num_features, row)?;

        let outputs = self.objective.num_outputs();
        let mut scores = if self.base_score.is_empty() {
            vec![0.0; outputs]
        } else {
            self.base_score.clone()
        };

        for (i, tree) in self.trees.iter().enumerate() {
            scores[i % outputs] += tree.eval(row)?;
        }

        Ok(scores)
    }

    pub fn predict(&self, row: &[f64]) -> Result<Label, EstimateError> {
        let scores = self.raw_scores(row)?;
        let label = match self.objective {
            Objective::Regression => Label::Value(scores[0]),
            Objective::Binary => {
                let class = usize::from(sigmoid(scores[0]) > 0.5);
                class_label(self.classes.as_deref(), class)
            }
            Objective::Multiclass { .. } => class_label(self.classes.as_deref(), argmax(&scores)),
        };
        Ok(label)
    }

    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, EstimateError> {
        match self.objective {
            Objective::Regression => Err(EstimateError::Unsupported("predict_proba")),
            Objective::Binary => {
                let p = sigmoid(self.raw_scores(row)?[0]);
                Ok(vec![1.0 - p, p])
            }
            Objective::Multiclass { .. } => Ok(softmax(&self.raw_scores(row)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    fn ensemble(estimator: crate::model::Estimator) -> TreeEnsemble {
        match estimator {
            crate::model::Estimator::GradientBoosting(m) => m,
            other => panic!("unexpected estimator {:?}", other),
        }
    }

    #[test]
    fn test_single_class_multiclass_is_invalid() {
        let mut m = ensemble(fixtures::multiclass_gbdt());
        m.objective = Objective::Multiclass { num_class: 1 };
        assert!(m.validate().is_err());

        m.objective = Objective::Multiclass { num_class: 0 };
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_split_routing() {
        let m = ensemble(fixtures::binary_gbdt());
        // a <= 0.5 goes to the negative leaf
        assert_eq!(m.raw_scores(&[0.0, 0.0, 0.0]).unwrap(), vec![-2.0]);
        assert_eq!(m.raw_scores(&[1.0, 0.0, 0.0]).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_missing_value_follows_default_direction() {
        let m = ensemble(fixtures::binary_gbdt());
        assert_eq!(m.raw_scores(&[f64::NAN, 0.0, 0.0]).unwrap(), vec![-2.0]);
    }

    #[test]
    fn test_binary_predict_and_proba() {
        let m = ensemble(fixtures::binary_gbdt());
        assert_eq!(
            m.predict(&[1.0, 0.0, 0.0]).unwrap(),
            Label::Class("CONFIRMED".into())
        );
        let p = m.predict_proba(&[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.len(), 2);
        assert!((p[1] - sigmoid(2.0)).abs() < 1e-12);
        assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_multiclass_round_robin_trees() {
        let m = ensemble(fixtures::multiclass_gbdt());
        let scores = m.raw_scores(&[5.0, 0.0]).unwrap();
        assert_eq!(scores.len(), 3);
        assert_eq!(m.predict(&[5.0, 0.0]).unwrap(), Label::Class("2".into()));
        let p = m.predict_proba(&[5.0, 0.0]).unwrap();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_regression_has_no_proba() {
        let m = ensemble(fixtures::regression_gbdt());
        assert_eq!(m.predict(&[3.0]).unwrap(), Label::Value(1.5));
        assert_eq!(
            m.predict_proba(&[3.0]).unwrap_err(),
            EstimateError::Unsupported("predict_proba")
        );
    }

    #[test]
    fn test_width_and_fitted_checks() {
        let m = ensemble(fixtures::binary_gbdt());
        assert_eq!(
            m.predict(&[1.0]).unwrap_err(),
            EstimateError::ShapeMismatch {
                expected: 3,
                got: 1
            }
        );

        let empty = TreeEnsemble {
            trees: Vec::new(),
            ..m
        };
        assert_eq!(
            empty.predict(&[0.0, 0.0, 0.0]).unwrap_err(),
            EstimateError::NotFitted
        );
    }

    #[test]
    fn test_validate_rejects_bad_children() {
        let mut m = ensemble(fixtures::binary_gbdt());
        m.trees[0].nodes[0] = Node::Split {
            feature: 0,
            threshold: 0.5,
            left: 0,
            right: 2,
            default_left: true,
        };
        assert!(m.validate().unwrap_err().contains("invalid child"));
    }

    #[test]
    fn test_validate_rejects_unknown_feature() {
        let mut m = ensemble(fixtures::binary_gbdt());
        m.trees[0].nodes[0] = Node::Split {
            feature: 7,
            threshold: 0.5,
            left: 1,
            right: 2,
            default_left: true,
        };
        assert!(m.validate().unwrap_err().contains("feature 7"));
    }

    #[test]
    fn test_unvalidated_cycle_is_a_defect() {
        let tree = Tree {
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 0,
                default_left: false,
            }],
        };
        assert!(matches!(
            tree.eval(&[1.0]).unwrap_err(),
            EstimateError::Defect(_)
        ));
    }
}
